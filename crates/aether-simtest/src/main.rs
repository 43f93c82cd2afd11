//! Aether Spire Headless Match Harness
//!
//! Drives the pure match logic through scripted scenarios and full matches.
//! Runs entirely in-process: no sockets, no async runtime.
//!
//! Usage:
//!   cargo run -p aether-simtest
//!   cargo run -p aether-simtest -- --verbose

use aether_logic::constants::timing;
use aether_logic::fix::FixStart;
use aether_logic::issues::{apply_issue_damage, definition, AcceleratingDamage};
use aether_logic::{
    calculate_score, Issue, IssueKind, IssueStatus, Layer, MatchConfig, MatchRng, MatchRuntime,
    Phase, ToolChoice,
};

// ── Test harness ────────────────────────────────────────────────────────

struct TestResult {
    name: String,
    passed: bool,
    detail: String,
}

fn main() {
    let verbose = std::env::args().any(|a| a == "--verbose");
    println!("=== Aether Spire Match Harness ===\n");

    let mut results = Vec::new();

    // 1. Seeded RNG stream
    results.extend(validate_rng(verbose));

    // 2. Damage curve
    results.extend(validate_damage(verbose));

    // 3. Cooperative fixing
    results.extend(validate_fixing(verbose));

    // 4. Unattended matches across seeds
    results.extend(validate_unattended_sweep(verbose));

    // 5. Bot crews playing full matches
    results.extend(validate_bot_matches(verbose));

    // 6. Scoring
    results.extend(validate_scoring(verbose));

    // 7. Wire shape of the snapshot
    results.extend(validate_snapshot_json(verbose));

    // ── Summary ──
    println!();
    let passed = results.iter().filter(|r| r.passed).count();
    let failed = results.iter().filter(|r| !r.passed).count();
    let total = results.len();

    for r in &results {
        let icon = if r.passed { "✓" } else { "✗" };
        if !r.passed || verbose {
            println!("  {} {}: {}", icon, r.name, r.detail);
        }
    }

    println!(
        "\n=== RESULT: {}/{} passed, {} failed ===",
        passed, total, failed
    );

    if failed > 0 {
        std::process::exit(1);
    }
}

fn surge(id: &str, x: f32, y: f32, spawn_time: u64) -> Issue {
    let def = definition(IssueKind::PressureSurge);
    Issue {
        id: id.into(),
        kind: IssueKind::PressureSurge,
        x,
        y,
        layer: Layer::Deck,
        spawn_time,
        base_fix_time: def.base_fix_secs,
        fix_time_with_tool: def.tool_fix_secs,
        required_tool: def.required_tool,
        stability_reward: def.stability_reward,
        status: IssueStatus::Active,
        required_players: 1,
        fixing_by: Vec::new(),
        fix_started_at: None,
        fix_duration_ms: None,
    }
}

// ── 1. RNG ──────────────────────────────────────────────────────────────

fn validate_rng(verbose: bool) -> Vec<TestResult> {
    println!("--- Seeded RNG ---");
    let mut results = Vec::new();

    let mut rng = MatchRng::new(1234);
    let seq: Vec<u32> = (0..3).map(|_| rng.next_raw()).collect();
    results.push(TestResult {
        name: "rng_known_sequence".into(),
        passed: seq == [3_021_131_492, 3_877_737_075, 4_168_477_787],
        detail: format!("seed 1234 → {:?}", seq),
    });

    let mut a = MatchRng::new(99);
    let mut b = MatchRng::new(99);
    let same = (0..10_000).all(|_| a.next_f64() == b.next_f64());
    results.push(TestResult {
        name: "rng_replayable".into(),
        passed: same,
        detail: "10k draws identical for equal seeds".into(),
    });

    let mut rng = MatchRng::new(7);
    let draws: Vec<f64> = (0..10_000).map(|_| rng.next_f64()).collect();
    let in_range = draws.iter().all(|d| (0.0..1.0).contains(d));
    let mean = draws.iter().sum::<f64>() / draws.len() as f64;
    if verbose {
        println!("  mean of 10k draws: {:.4}", mean);
    }
    results.push(TestResult {
        name: "rng_unit_interval".into(),
        passed: in_range && (0.48..0.52).contains(&mean),
        detail: format!("all in [0,1), mean {:.4}", mean),
    });

    results
}

// ── 2. Damage ───────────────────────────────────────────────────────────

fn validate_damage(_verbose: bool) -> Vec<TestResult> {
    println!("--- Damage Curve ---");
    let mut results = Vec::new();

    let fresh = vec![surge("s", 0.0, 0.0, 1_000)];
    let out = apply_issue_damage(&AcceleratingDamage, &fresh, 100.0, 1_000);
    results.push(TestResult {
        name: "damage_fresh_issue".into(),
        passed: (out.new_stability - 99.6).abs() < 1e-9,
        detail: format!("100 → {:.2}", out.new_stability),
    });

    let mut busy = surge("s", 0.0, 0.0, 0);
    busy.status = IssueStatus::InProgress;
    let out = apply_issue_damage(&AcceleratingDamage, &[busy], 50.0, 60_000);
    results.push(TestResult {
        name: "damage_skips_in_progress".into(),
        passed: out.total_damage == 0.0,
        detail: format!("in-progress damage {}", out.total_damage),
    });

    let old = vec![surge("a", 0.0, 0.0, 0); 5];
    let out = apply_issue_damage(&AcceleratingDamage, &old, 2.0, 120_000);
    results.push(TestResult {
        name: "damage_floors_at_zero".into(),
        passed: out.new_stability == 0.0,
        detail: format!("2.0 - {:.1} → {}", out.total_damage, out.new_stability),
    });

    results
}

// ── 3. Fixing ───────────────────────────────────────────────────────────

fn validate_fixing(_verbose: bool) -> Vec<TestResult> {
    println!("--- Cooperative Fixing ---");
    let mut results = Vec::new();

    let mut m = MatchRuntime::new("fix", 1, MatchConfig::default(), 0);
    m.state.issues.push(surge("surge", 1600.0, 1200.0, 0));
    m.move_player("a", 1600.0, 1200.0, 0);
    m.move_player("b", 1600.0, 1230.0, 0);

    let first = m.start_fix("a", "surge", ToolChoice::Default, 0);
    let helper = m.start_fix("b", "surge", ToolChoice::Default, 6_000);
    let converged = matches!(
        (m.fix_progress("a"), m.fix_progress("b")),
        (Some(pa), Some(pb)) if pa.duration_ms == pb.duration_ms && pa.started_at == pb.started_at
    );
    results.push(TestResult {
        name: "helper_join_converges".into(),
        passed: matches!(first, Ok(FixStart::Started { .. }))
            && helper == Ok(FixStart::Joined { duration_ms: 11_400.0 })
            && converged,
        detail: format!("helper result {:?}", helper),
    });

    let early = m.tick(10_600).map(|r| r.fixed_issues.len()).unwrap_or(0);
    let on_time = m.tick(11_400).map(|r| r.fixed_issues.len()).unwrap_or(0);
    results.push(TestResult {
        name: "helper_fix_completes_on_deadline".into(),
        passed: early == 0 && on_time == 1 && m.state.issues_fixed == 1,
        detail: format!("fixed at 10600: {}, at 11400: {}", early, on_time),
    });

    let mut m = MatchRuntime::new("late", 1, MatchConfig::default(), 0);
    m.state.issues.push(surge("surge", 10.0, 10.0, 0));
    m.move_player("a", 10.0, 10.0, 0);
    let _ = m.start_fix("a", "surge", ToolChoice::Default, 0);
    let cancel = m.cancel_fix("a", 15_000);
    let fixed = m.tick(15_000).map(|r| r.fixed_issues.len()).unwrap_or(0);
    results.push(TestResult {
        name: "late_cancel_ignored".into(),
        passed: cancel.is_err() && fixed == 1,
        detail: format!("cancel {:?}, fixed {}", cancel, fixed),
    });

    results
}

// ── 4. Unattended sweep ─────────────────────────────────────────────────

fn validate_unattended_sweep(verbose: bool) -> Vec<TestResult> {
    println!("--- Unattended Sweep ---");
    let mut results = Vec::new();

    let mut all_lost = true;
    let mut bounded = true;
    let mut replayable = true;
    let mut lengths = Vec::new();

    for seed in 0..20u32 {
        let (runtime, ticks, ok) = run_unattended(seed, 3);
        bounded &= ok;
        all_lost &= runtime.is_over() && !runtime.state.won;
        lengths.push(ticks);

        let (again, _, _) = run_unattended(seed, 3);
        replayable &= again.state == runtime.state;
    }
    if verbose {
        println!("  ticks until loss: {:?}", lengths);
    }

    results.push(TestResult {
        name: "unattended_always_lost".into(),
        passed: all_lost,
        detail: format!("20 seeds, min {} max {} ticks", min(&lengths), max(&lengths)),
    });
    results.push(TestResult {
        name: "unattended_stability_bounded".into(),
        passed: bounded,
        detail: "stability in [0,100] and fixers consistent every tick".into(),
    });
    results.push(TestResult {
        name: "unattended_replayable".into(),
        passed: replayable,
        detail: "same seed twice gives identical final state".into(),
    });

    results
}

fn run_unattended(seed: u32, players: u32) -> (MatchRuntime, u64, bool) {
    let mut m = MatchRuntime::new(format!("sweep-{seed}"), seed, MatchConfig::default(), 0);
    m.set_player_count(players);
    let mut ok = true;
    let mut ticks = 0;
    let mut now = 0;
    while !m.is_over() {
        now += timing::TICK_INTERVAL_MS;
        m.tick(now);
        ticks += 1;
        ok &= (0.0..=100.0).contains(&m.state.stability) && fixers_consistent(&m);
    }
    (m, ticks, ok)
}

fn fixers_consistent(m: &MatchRuntime) -> bool {
    m.state.issues.iter().all(|i| match i.status {
        IssueStatus::Active => i.fixing_by.is_empty(),
        IssueStatus::InProgress => !i.fixing_by.is_empty(),
        IssueStatus::Fixed => false,
    })
}

fn min(v: &[u64]) -> u64 {
    v.iter().copied().min().unwrap_or(0)
}

fn max(v: &[u64]) -> u64 {
    v.iter().copied().max().unwrap_or(0)
}

// ── 5. Bot crews ────────────────────────────────────────────────────────

/// One greedy step per bot: an idle bot grabs any instrument on its layer,
/// then teleports to the first repairable issue, crossing a hatch when the
/// issue is on the other layer.
fn bot_step(m: &mut MatchRuntime, bot: &str, now: u64) {
    if m.fix_progress(bot).is_some() {
        return;
    }
    let Some(me) = m.player(bot).cloned() else {
        return;
    };

    if let Some(inst) = m
        .state
        .ground_instruments
        .iter()
        .find(|g| g.layer == me.layer)
        .cloned()
    {
        m.move_player(bot, inst.x, inst.y, now);
        let _ = m.pickup_tool(bot, &inst.id);
    }

    let target = m
        .state
        .issues
        .iter()
        .filter(|i| i.status == IssueStatus::Active)
        .chain(
            m.state
                .issues
                .iter()
                .filter(|i| {
                    i.status == IssueStatus::InProgress && !i.fixing_by.iter().any(|f| f == bot)
                }),
        )
        .map(|i| (i.id.clone(), i.x, i.y, i.layer, i.required_tool))
        .next();
    let Some((issue_id, x, y, layer, tool)) = target else {
        return;
    };

    if layer != me.layer {
        let entry = m
            .state
            .hatches
            .first()
            .and_then(|h| h.sides_from(me.layer))
            .map(|((_, entry), _)| entry);
        if let Some(entry) = entry {
            m.move_player(bot, entry.x, entry.y, now);
            let _ = m.use_hatch(bot, "hatch-fore", now);
        }
    }

    m.move_player(bot, x, y, now);
    let choice = if m.state.team_inventory.contains(&tool) {
        match tool {
            aether_logic::ToolKind::ArcaneConduit => ToolChoice::ArcaneConduit,
            aether_logic::ToolKind::GearWrench => ToolChoice::GearWrench,
            aether_logic::ToolKind::ThermalRegulator => ToolChoice::ThermalRegulator,
        }
    } else {
        ToolChoice::Default
    };
    if m.start_fix(bot, &issue_id, choice, now).is_err() {
        let _ = m.start_fix(bot, &issue_id, ToolChoice::Default, now);
    }
}

fn run_bot_match(seed: u32, crew: usize) -> (MatchRuntime, bool) {
    let mut m = MatchRuntime::new(format!("bots-{seed}"), seed, MatchConfig::default(), 0);
    let bots: Vec<String> = (0..crew).map(|i| format!("bot{i}")).collect();
    for bot in &bots {
        m.join_player(bot, bot);
    }
    m.set_player_count(crew as u32);

    let mut ok = true;
    let mut now = 0;
    let mut last_phase = m.state.phase;
    let mut phases_in_order = true;
    while !m.is_over() {
        now += timing::TICK_INTERVAL_MS;
        m.tick(now);
        for bot in &bots {
            bot_step(&mut m, bot, now);
        }
        phases_in_order &= phase_rank(m.state.phase) >= phase_rank(last_phase);
        last_phase = m.state.phase;
        ok &= (0.0..=100.0).contains(&m.state.stability) && fixers_consistent(&m);
    }
    (m, ok && phases_in_order)
}

fn phase_rank(p: Phase) -> u8 {
    match p {
        Phase::Early => 0,
        Phase::Mid => 1,
        Phase::Crisis => 2,
        Phase::Final => 3,
    }
}

fn validate_bot_matches(verbose: bool) -> Vec<TestResult> {
    println!("--- Bot Crews ---");
    let mut results = Vec::new();

    for crew in [1usize, 2, 4] {
        let (m, ok) = run_bot_match(2024, crew);
        let card = m.score();
        if verbose {
            println!(
                "  crew {}: won={} fixed={} stability={:.1} score={} stars={}",
                crew, m.state.won, m.state.issues_fixed, m.state.stability, card.score, card.stars
            );
        }
        results.push(TestResult {
            name: format!("bot_crew_{}_invariants", crew),
            passed: ok && m.is_over(),
            detail: format!(
                "won={} fixed={} score={}",
                m.state.won, m.state.issues_fixed, card.score
            ),
        });
    }

    let (m, _) = run_bot_match(7, 4);
    results.push(TestResult {
        name: "bot_crew_4_survives".into(),
        passed: m.state.won && m.state.time_remaining_sec == 0,
        detail: format!(
            "stability {:.1}, {} issues fixed",
            m.state.stability, m.state.issues_fixed
        ),
    });

    results
}

// ── 6. Scoring ──────────────────────────────────────────────────────────

fn validate_scoring(_verbose: bool) -> Vec<TestResult> {
    println!("--- Scoring ---");
    let mut results = Vec::new();

    let mut m = MatchRuntime::new("score", 1, MatchConfig::default(), 0);
    m.state.issues_fixed = 10;
    m.state.time_remaining_sec = 120;
    m.state.stability = 75.4;
    let card = calculate_score(&m.state, 420);
    results.push(TestResult {
        name: "score_reference".into(),
        passed: card.score == 395 && card.stars == 4,
        detail: format!("score {} stars {}", card.score, card.stars),
    });

    m.state.issues_fixed = 0;
    m.state.time_remaining_sec = 420;
    m.state.stability = 0.0;
    let card = calculate_score(&m.state, 420);
    results.push(TestResult {
        name: "score_floor_one_star".into(),
        passed: card.score == 0 && card.stars == 1,
        detail: format!("score {} stars {}", card.score, card.stars),
    });

    results
}

// ── 7. Snapshot JSON ────────────────────────────────────────────────────

fn validate_snapshot_json(_verbose: bool) -> Vec<TestResult> {
    println!("--- Snapshot JSON ---");
    let mut results = Vec::new();

    let mut m = MatchRuntime::new("json", 3, MatchConfig::default(), 0);
    m.state.issues.push(surge("surge", 1.0, 2.0, 0));
    let json = match serde_json::to_value(&m.state) {
        Ok(v) => v,
        Err(e) => {
            results.push(TestResult {
                name: "snapshot_serialize".into(),
                passed: false,
                detail: format!("serialize error: {}", e),
            });
            return results;
        }
    };

    let keys = [
        "matchId",
        "seed",
        "phase",
        "timeRemainingSec",
        "nextTickAt",
        "stability",
        "issues",
        "teamInventory",
        "groundInstruments",
        "issuesFixed",
        "gameOver",
        "won",
    ];
    let missing: Vec<&str> = keys.iter().copied().filter(|k| json.get(*k).is_none()).collect();
    results.push(TestResult {
        name: "snapshot_keys".into(),
        passed: missing.is_empty(),
        detail: if missing.is_empty() {
            "all camelCase keys present".into()
        } else {
            format!("missing {:?}", missing)
        },
    });

    let issue = &json["issues"][0];
    results.push(TestResult {
        name: "snapshot_issue_shape".into(),
        passed: issue["type"] == "pressure_surge"
            && issue["requiredTool"] == "thermal_regulator"
            && issue["status"] == "active"
            && issue.get("fixStartedAt").is_none(),
        detail: format!("{}", issue),
    });

    results
}
