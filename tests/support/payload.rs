use serde_json::{json, Value};

pub const NOW_MS: i64 = 1_700_000_000_000;

pub fn signal() -> Value {
    json!({
        "timestamp": NOW_MS,
        "symbol": "BTC",
        "confidence": 0.85,
        "strength": 72.5,
        "phase": 1.57,
    })
}

pub fn confidence_change() -> Value {
    json!({
        "timestamp": NOW_MS,
        "old_confidence": 0.4,
        "new_confidence": 0.7,
        "reason": "trend confirmed",
    })
}

pub fn strength_shift(direction: &str) -> Value {
    json!({
        "timestamp": NOW_MS,
        "delta": 4.0,
        "current_level": 60.0,
        "direction": direction,
    })
}

pub fn phase_transition() -> Value {
    json!({
        "timestamp": NOW_MS,
        "from_phase": 0.0,
        "to_phase": 1.0,
        "transition_speed": 0.2,
    })
}

pub fn resonance_detected() -> Value {
    json!({
        "timestamp": NOW_MS,
        "frequency": 440.0,
        "amplitude": 0.3,
        "source": "fft",
    })
}

pub fn sequence(seq: u64) -> Value {
    json!({ "seq": seq })
}
