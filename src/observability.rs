use biometrics::{Collector, Counter, Moments};

pub(crate) static CLIENT_REQUESTS: Counter = Counter::new("chatline.client.requests");
pub(crate) static CLIENT_REQUEST_ERRORS: Counter = Counter::new("chatline.client.request_errors");
pub(crate) static CLIENT_UPSTREAM_ERRORS: Counter =
    Counter::new("chatline.client.upstream_errors");
pub(crate) static CLIENT_REQUEST_DURATION: Moments =
    Moments::new("chatline.client.request_duration_seconds");

pub(crate) static STREAM_BYTES: Counter = Counter::new("chatline.stream.bytes");
pub(crate) static STREAM_TOKENS: Counter = Counter::new("chatline.stream.tokens");
pub(crate) static STREAM_NOISE: Counter = Counter::new("chatline.stream.noise_lines");
pub(crate) static STREAM_TTFB: Moments = Moments::new("chatline.stream.ttfb_seconds");

pub(crate) static SESSION_TURNS: Counter = Counter::new("chatline.session.turns");
pub(crate) static SESSION_TURN_FAILURES: Counter = Counter::new("chatline.session.turn_failures");
pub(crate) static SESSION_RESETS: Counter = Counter::new("chatline.session.resets");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: Collector) {
    collector.register_counter(&CLIENT_REQUESTS);
    collector.register_counter(&CLIENT_REQUEST_ERRORS);
    collector.register_counter(&CLIENT_UPSTREAM_ERRORS);
    collector.register_moments(&CLIENT_REQUEST_DURATION);

    collector.register_counter(&STREAM_BYTES);
    collector.register_counter(&STREAM_TOKENS);
    collector.register_counter(&STREAM_NOISE);
    collector.register_moments(&STREAM_TTFB);

    collector.register_counter(&SESSION_TURNS);
    collector.register_counter(&SESSION_TURN_FAILURES);
    collector.register_counter(&SESSION_RESETS);
}
