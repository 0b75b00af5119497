//! End-to-end telegraphy tests.
//!
//! These tests run both participants inside one paused-clock tokio runtime:
//! 1. Both sessions grid-align on identically anchored clocks
//! 2. Both saturate the shared cap; the race decides sender and receiver
//! 3. The sender modulates unheld slots, one digit per pulse
//! 4. The receiver probes mid-pulse and reconstructs the word
//!
//! With `start_paused`, the tokio clock advances only when every task is
//! suspended on a timer, so the pulse schedules interleave exactly as the
//! wall-clock arithmetic says they should, with no real sleeping and no
//! flaky timing margins.

use slotwire::{
    Clock, CycleOutcome, EpochMillis, Payload, Pool, Role, Session, SessionConfig, SessionError,
    SharedCapEndpoint,
};

/// The reference end-to-end vector: 5 digits, radix 128, ~35 bits.
const REFERENCE_PAYLOAD: u64 = 12_345_678_901;
const REFERENCE_HEX: &str = "2dfdc1c35";

/// A compact configuration for tests that exercise settling delays:
/// 3 digits in radix 8 over a cap of 16, 100ms pulses, 10ms settling.
fn compact_config() -> SessionConfig {
    SessionConfig::new(3, 16, 8, 100, 100, 10)
}

fn anchored_pair(
    endpoint: &SharedCapEndpoint,
    config: &SessionConfig,
) -> (Session<SharedCapEndpoint>, Session<SharedCapEndpoint>) {
    let clock = Clock::anchored(EpochMillis::new(1_000));
    (
        Session::new(endpoint.clone(), clock.clone(), config.clone()),
        Session::new(endpoint.clone(), clock, config.clone()),
    )
}

/// Splits a report pair into (sender, receiver) regardless of which
/// participant won the negotiation race.
fn by_role(
    a: slotwire::CycleReport,
    b: slotwire::CycleReport,
) -> (slotwire::CycleReport, slotwire::CycleReport) {
    match (a.role, b.role) {
        (Role::Sender, Role::Receiver) => (a, b),
        (Role::Receiver, Role::Sender) => (b, a),
        other => panic!("expected one sender and one receiver, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn reference_payload_round_trips() {
    let endpoint = SharedCapEndpoint::new(255);
    let config = SessionConfig::websocket_chrome();
    let (mut alpha, mut beta) = anchored_pair(&endpoint, &config);

    let (ra, rb) = tokio::join!(
        alpha.run_cycle(Payload::Fixed(REFERENCE_PAYLOAD)),
        beta.run_cycle(Payload::Fixed(REFERENCE_PAYLOAD)),
    );
    let (sent, received) = by_role(ra, rb);

    assert_eq!(sent.outcome, CycleOutcome::Sent { hex: REFERENCE_HEX.into() });
    assert_eq!(
        received.outcome,
        CycleOutcome::Received {
            hex: REFERENCE_HEX.into(),
            // 12_345_678_901 in radix 128, least-significant first.
            digits: vec![53, 56, 112, 126, 45],
        }
    );
    assert_eq!(sent.t0_ms, received.t0_ms, "participants agreed on t0");

    // Drain guarantee: nothing held by anyone after the cycle.
    assert_eq!(alpha.held(), 0);
    assert_eq!(beta.held(), 0);
    assert_eq!(endpoint.occupied(), 0);
}

#[tokio::test(start_paused = true)]
async fn digit_zero_is_distinguishable_from_silence() {
    // Value 0 encodes as all-zero digits; each pulse leaves exactly one
    // slot unheld, which must decode as digit 0, not as "no signal".
    let endpoint = SharedCapEndpoint::new(16);
    let config = compact_config();
    let (mut alpha, mut beta) = anchored_pair(&endpoint, &config);

    let (ra, rb) = tokio::join!(
        alpha.run_cycle(Payload::Fixed(0)),
        beta.run_cycle(Payload::Fixed(0)),
    );
    let (sent, received) = by_role(ra, rb);

    let zero_hex = "000";
    assert_eq!(sent.outcome, CycleOutcome::Sent { hex: zero_hex.into() });
    assert_eq!(
        received.outcome,
        CycleOutcome::Received {
            hex: zero_hex.into(),
            digits: vec![0, 0, 0],
        }
    );
}

#[tokio::test(start_paused = true)]
async fn repeated_cycles_stay_phase_locked() {
    let endpoint = SharedCapEndpoint::new(16);
    let config = compact_config();
    let (mut alpha, mut beta) = anchored_pair(&endpoint, &config);

    let (ras, rbs) = tokio::join!(
        alpha.run(3, Payload::Random),
        beta.run(3, Payload::Random),
    );

    for (ra, rb) in ras.into_iter().zip(rbs) {
        let (sent, received) = by_role(ra, rb);
        let sent_hex = match sent.outcome {
            CycleOutcome::Sent { hex } => hex,
            other => panic!("sender outcome: {other:?}"),
        };
        let received_hex = match received.outcome {
            CycleOutcome::Received { hex, .. } => hex,
            other => panic!("receiver outcome: {other:?}"),
        };
        assert_eq!(sent_hex, received_hex);
    }
    assert_eq!(endpoint.occupied(), 0);
}

#[tokio::test(start_paused = true)]
async fn sole_participant_negotiates_sender() {
    // Negotiation determinism under saturation: with nobody else racing,
    // the sole participant ends up holding the whole cap, hence Sender.
    let endpoint = SharedCapEndpoint::new(64);
    let config = SessionConfig::new(3, 64, 16, 100, 100, 0).with_oversubscribe(2);
    let mut session = Session::new(
        endpoint.clone(),
        Clock::anchored(EpochMillis::new(0)),
        config,
    );

    let role = session.negotiate().await;
    assert_eq!(role, Role::Sender);
    assert_eq!(session.held(), 64, "holdings bounded by the cap");
}

#[tokio::test(start_paused = true)]
async fn saturated_cap_with_no_sender_reports_garbled_cycle() {
    // A third party holds the entire cap but never modulates it. The
    // session loses the negotiation race (consumes nothing), probes zero
    // unheld slots at the first pulse, and aborts with a partial result --
    // after draining.
    let endpoint = SharedCapEndpoint::new(16);
    let config = compact_config();

    let clock = Clock::anchored(EpochMillis::new(0));
    let mut squatter = Pool::new(endpoint.clone(), clock.clone(), 0);
    squatter.consume(16).await;

    let mut session = Session::new(endpoint.clone(), clock, config);
    let report = session.run_cycle(Payload::Random).await;

    assert_eq!(report.role, Role::Receiver);
    assert_eq!(
        report.outcome,
        CycleOutcome::Garbled {
            pulse: 0,
            observed: 0,
            partial_hex: "000".into(),
        }
    );
    assert_eq!(session.held(), 0, "drain runs on the failure path too");
    assert_eq!(endpoint.occupied(), 16, "the squatter's slots are not ours to free");
}

#[tokio::test(start_paused = true)]
async fn skew_within_half_a_pulse_still_decodes() {
    // One participant's wall clock runs 20ms ahead. Mid-pulse sampling
    // tolerates skew up to half a pulse, so the transfer still decodes.
    let endpoint = SharedCapEndpoint::new(16);
    let config = compact_config();

    let mut early = Session::new(
        endpoint.clone(),
        Clock::anchored(EpochMillis::new(1_020)),
        config.clone(),
    );
    let mut late = Session::new(
        endpoint.clone(),
        Clock::anchored(EpochMillis::new(1_000)),
        config,
    );

    let payload = Payload::Fixed(0o512); // digits [2, 1, 5]
    let (re, rl) = tokio::join!(early.run_cycle(payload), late.run_cycle(payload));
    let (sent, received) = by_role(re, rl);

    let expected = slotwire::codec::to_fixed_hex(0o512, slotwire::codec::num_bits(3, 8));
    assert_eq!(sent.outcome, CycleOutcome::Sent { hex: expected.clone() });
    assert_eq!(
        received.outcome,
        CycleOutcome::Received {
            hex: expected,
            digits: vec![2, 1, 5],
        }
    );
}

#[tokio::test(start_paused = true)]
async fn skew_beyond_a_pulse_garbles_the_decode() {
    // 150ms of skew against 100ms pulses: the schedules shear apart and
    // the decode comes back wrong or aborts. The design detects nothing
    // here -- the only guarantee left is that both pools drain.
    let endpoint = SharedCapEndpoint::new(16);
    let config = compact_config();

    let mut early = Session::new(
        endpoint.clone(),
        Clock::anchored(EpochMillis::new(1_150)),
        config.clone(),
    );
    let mut late = Session::new(
        endpoint.clone(),
        Clock::anchored(EpochMillis::new(1_000)),
        config,
    );

    let payload = Payload::Fixed(0o512);
    let (re, rl) = tokio::join!(early.run_cycle(payload), late.run_cycle(payload));
    let (sent, received) = by_role(re, rl);

    let sent_hex = match sent.outcome {
        CycleOutcome::Sent { hex } => hex,
        other => panic!("sender outcome: {other:?}"),
    };
    match received.outcome {
        CycleOutcome::Received { hex, .. } => assert_ne!(hex, sent_hex),
        CycleOutcome::Garbled { .. } => {}
        CycleOutcome::Sent { .. } => panic!("receiver cannot have sent"),
    }

    assert_eq!(early.held(), 0);
    assert_eq!(late.held(), 0);
}

#[tokio::test(start_paused = true)]
async fn connection_setup_latency_is_tolerated() {
    // 5ms per connection setup against 10ms settling: creations resolve
    // inside the settling window and the transfer is unaffected. The
    // anchors differ by 10ms so the saturation race has a clear winner
    // even though both creation batches are in flight at once.
    let endpoint = SharedCapEndpoint::with_create_latency(16, 5);
    let config = compact_config();
    let mut alpha = Session::new(
        endpoint.clone(),
        Clock::anchored(EpochMillis::new(1_010)),
        config.clone(),
    );
    let mut beta = Session::new(
        endpoint.clone(),
        Clock::anchored(EpochMillis::new(1_000)),
        config,
    );

    let payload = Payload::Fixed(0o347); // digits [7, 4, 3]
    let (ra, rb) = tokio::join!(alpha.run_cycle(payload), beta.run_cycle(payload));
    let (sent, received) = by_role(ra, rb);

    let expected = slotwire::codec::to_fixed_hex(0o347, slotwire::codec::num_bits(3, 8));
    assert_eq!(sent.outcome, CycleOutcome::Sent { hex: expected.clone() });
    assert_eq!(
        received.outcome,
        CycleOutcome::Received {
            hex: expected,
            digits: vec![7, 4, 3],
        }
    );
    assert_eq!(endpoint.occupied(), 0);
}

#[tokio::test(start_paused = true)]
async fn free_capacity_above_radix_reads_as_desync() {
    // Nobody holds the cap: a probe acquires more slots than any digit
    // could leave unheld, and the receiver aborts rather than misreading
    // idle capacity as a digit.
    let endpoint = SharedCapEndpoint::new(16);
    let config = compact_config();
    let mut session = Session::new(
        endpoint.clone(),
        Clock::anchored(EpochMillis::new(0)),
        config,
    );

    let err = session.receive(EpochMillis::new(0)).await.unwrap_err();
    assert_eq!(
        err,
        SessionError::Desynchronized {
            pulse: 0,
            observed: 9,
            partial: 0,
        }
    );
    assert_eq!(session.held(), 0);
    assert_eq!(endpoint.occupied(), 0, "probe slots are all released");
}

#[tokio::test(start_paused = true)]
async fn reports_serialize_for_the_collector_sink() {
    let endpoint = SharedCapEndpoint::new(16);
    let config = compact_config();
    let (mut alpha, mut beta) = anchored_pair(&endpoint, &config);

    let (ra, _rb) = tokio::join!(
        alpha.run_cycle(Payload::Fixed(1)),
        beta.run_cycle(Payload::Fixed(1)),
    );

    let json = serde_json::to_string(&ra).expect("report serializes");
    assert!(json.contains("\"role\""));
    assert!(json.contains("\"trace\""));
    assert!(!ra.trace.is_empty(), "trace captured occupancy samples");
}
