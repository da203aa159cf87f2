//! Property tests for classification.
//!
//! Inputs come from a seeded xorshift generator so failures are reproducible.
//!
//! ## Properties
//!
//! - Input holding exactly one trigger classifies as that trigger's code
//! - Input holding no trigger is UNKNOWN
//! - Boundary suppression holds for any sequence length
//! - A failing backend never changes the pattern answer
//! - Boundary answers survive a serialize/validate/rebuild round trip

use stage_shared::patterns::DEFAULT_RULES;
use stage_shared::{
    is_valid_task_context, BackendError, IntentCode, TaskContext,
};
use stagectl::{ClassificationEngine, FakeBackend};
use std::sync::Arc;

// ============================================================================
// TEST HELPERS
// ============================================================================

/// xorshift64
struct TestRng {
    state: u64,
}

impl TestRng {
    fn new(seed: u64) -> Self {
        Self { state: if seed == 0 { 1 } else { seed } }
    }

    fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }

    fn next_range(&mut self, min: u64, max: u64) -> u64 {
        if max <= min { return min; }
        min + (self.next_u64() % (max - min))
    }

    fn pick<'a, T>(&mut self, items: &'a [T]) -> &'a T {
        &items[self.next_range(0, items.len() as u64) as usize]
    }

    /// Filler text that cannot contain any default trigger
    fn filler(&mut self, max_len: u64) -> String {
        const ALPHABET: &[char] = &['x', 'z', 'q', 'j', '0', '7', ' ', ' ', '.'];
        let len = self.next_range(0, max_len);
        (0..len).map(|_| *self.pick(ALPHABET)).collect()
    }

    /// Randomly upper-case some characters
    fn shout(&mut self, s: &str) -> String {
        s.chars()
            .map(|c| if self.next_u64() % 2 == 0 { c.to_ascii_uppercase() } else { c })
            .collect()
    }
}

fn sequence(len: usize, current: usize) -> TaskContext {
    let mut ctx = TaskContext::new("task", "Generated task", "in progress");
    for i in 0..len {
        ctx = ctx.with_stage(&format!("s{}", i), &format!("Stage {}", i), (i * 10) as f64);
    }
    ctx.with_current_stage(&format!("s{}", current))
}

// ============================================================================
// Trigger properties
// ============================================================================

#[tokio::test]
async fn test_prop_single_trigger_selects_its_code() {
    let engine = ClassificationEngine::default();
    let mut rng = TestRng::new(42);

    for _ in 0..500 {
        let (code, triggers) = rng.pick(DEFAULT_RULES);
        let trigger = *rng.pick(triggers);
        let input = format!("{}{}{}", rng.filler(12), rng.shout(trigger), rng.filler(12));

        assert_eq!(
            engine.classify_intent(&input, None).await,
            *code,
            "input: {:?}",
            input
        );
    }
}

#[tokio::test]
async fn test_prop_no_trigger_is_unknown() {
    let engine = ClassificationEngine::default();
    let mut rng = TestRng::new(7);

    for _ in 0..500 {
        let input = rng.filler(40);
        assert_eq!(
            engine.classify_intent(&input, None).await,
            IntentCode::Unknown,
            "input: {:?}",
            input
        );
    }
}

// ============================================================================
// Boundary properties
// ============================================================================

#[tokio::test]
async fn test_prop_boundaries_suppress_outward_moves() {
    let engine = ClassificationEngine::default();
    let mut rng = TestRng::new(1234);

    for _ in 0..200 {
        let len = rng.next_range(1, 9) as usize;
        let current = rng.next_range(0, len as u64) as usize;
        let ctx = sequence(len, current);

        let back = engine.classify_intent("go back", Some(&ctx)).await;
        let next = engine.classify_intent("next", Some(&ctx)).await;

        let expected_back = if current == 0 { IntentCode::Unknown } else { IntentCode::Previous };
        let expected_next = if current == len - 1 { IntentCode::Unknown } else { IntentCode::Next };
        assert_eq!(back, expected_back, "len {} current {}", len, current);
        assert_eq!(next, expected_next, "len {} current {}", len, current);
    }
}

#[test]
fn test_prop_round_trip_keeps_boundaries() {
    let engine = ClassificationEngine::default();
    let mut rng = TestRng::new(99);

    for _ in 0..100 {
        let len = rng.next_range(1, 12) as usize;
        let current = rng.next_range(0, len as u64) as usize;
        let ctx = sequence(len, current);

        let value = ctx.to_value().unwrap();
        assert!(is_valid_task_context(&value));
        let rebuilt = TaskContext::from_value(&value).unwrap();

        for stage in &ctx.stages {
            assert_eq!(
                engine.is_at_first_stage(Some(&ctx), &stage.id),
                engine.is_at_first_stage(Some(&rebuilt), &stage.id)
            );
            assert_eq!(
                engine.is_at_last_stage(Some(&ctx), &stage.id),
                engine.is_at_last_stage(Some(&rebuilt), &stage.id)
            );
        }
    }
}

// ============================================================================
// Backend failure properties
// ============================================================================

#[tokio::test]
async fn test_prop_failing_backend_matches_patterns() {
    let plain = ClassificationEngine::default();
    let errors = [
        BackendError::Connection("refused".into()),
        BackendError::Timeout("slow".into()),
        BackendError::Response("garbled".into()),
    ];
    let mut rng = TestRng::new(2024);

    for _ in 0..100 {
        let err = rng.pick(&errors).clone();
        let engine =
            ClassificationEngine::default().with_backend(Arc::new(FakeBackend::failing(err)));

        let (_, triggers) = rng.pick(DEFAULT_RULES);
        let input = format!("{} {}", rng.filler(6), rng.pick(triggers));
        let len = rng.next_range(1, 5) as usize;
        let ctx = sequence(len, rng.next_range(0, len as u64) as usize);

        assert_eq!(
            engine.classify_intent(&input, Some(&ctx)).await,
            plain.classify_intent(&input, Some(&ctx)).await,
            "input: {:?}",
            input
        );
    }
}
