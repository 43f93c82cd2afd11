//! The per-match runtime and its authoritative tick.
//!
//! A tick runs a fixed sequence of steps and must not be reordered:
//!
//! 1. spawn an issue if the interval has elapsed
//! 2. apply damage from active issues
//! 3. resolve fix completions
//! 4. respawn instruments whose cooldown has elapsed
//! 5. expire and create lockouts (only when configured)
//! 6. recompute phase from the *pre-decrement* remaining time
//! 7. lose if stability reached 0
//! 8. decrement remaining time
//! 9. win if time ran out with stability left
//!
//! Once `game_over` is set, or the clock has reached 0, `tick` is a no-op.

use std::collections::BTreeMap;

use crate::config::MatchConfig;
use crate::constants::{phases, stability};
use crate::fix::FixProgress;
use crate::issues::{apply_issue_damage, AcceleratingDamage, DamagePolicy};
use crate::map::hatch_definitions;
use crate::players::PlayerState;
use crate::rng::MatchRng;
use crate::spawn::{issue_spawn_due, tool_respawn_eligible, SpawnPolicy, WeightedSpawn};
use crate::state::{GameState, Layer, Phase, ToolKind};

/// Map remaining seconds to a phase. Boundaries belong to the later phase:
/// exactly 300 is `Mid`, exactly 30 is `Final`.
pub fn phase_for_time(time_remaining_sec: u32) -> Phase {
    if time_remaining_sec > phases::EARLY_ABOVE_SECS {
        Phase::Early
    } else if time_remaining_sec > phases::MID_ABOVE_SECS {
        Phase::Mid
    } else if time_remaining_sec > phases::CRISIS_ABOVE_SECS {
        Phase::Crisis
    } else {
        Phase::Final
    }
}

/// What one tick did. Useful for logging and replay comparison.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    pub spawned_issue: Option<String>,
    pub damage: f64,
    pub fixed_issues: Vec<String>,
    pub spawned_instruments: Vec<String>,
    pub ended: bool,
}

/// One authoritative match simulation.
#[derive(Debug, Clone)]
pub struct MatchRuntime {
    pub state: GameState,
    pub config: MatchConfig,
    pub player_count: u32,
    pub last_tick_at: u64,
    pub last_issue_spawn_at: u64,
    pub last_instrument_spawn_at: BTreeMap<ToolKind, u64>,
    pub last_lockout_at: u64,
    pub(crate) rng: MatchRng,
    pub(crate) fix_progress: BTreeMap<String, FixProgress>,
    pub(crate) players: BTreeMap<String, PlayerState>,
    pub(crate) doors: BTreeMap<String, bool>,
    next_issue_seq: u64,
    next_instrument_seq: u64,
}

impl MatchRuntime {
    /// Start a match at `now_ms`. One instrument of each kind is placed on
    /// the deck and every instrument cooldown starts now.
    pub fn new(match_id: impl Into<String>, seed: u32, config: MatchConfig, now_ms: u64) -> Self {
        let mut rng = MatchRng::new(seed);
        let policy = WeightedSpawn::default();

        let ground_instruments = ToolKind::ALL
            .iter()
            .enumerate()
            .map(|(i, kind)| {
                policy.create_instrument(
                    &mut rng,
                    format!("inst_init_{i}"),
                    *kind,
                    Layer::Deck,
                    now_ms,
                )
            })
            .collect();

        let state = GameState {
            match_id: match_id.into(),
            seed,
            phase: phase_for_time(config.duration_secs),
            time_remaining_sec: config.duration_secs,
            next_tick_at: now_ms + config.tick_interval_ms,
            stability: stability::MAX,
            issues: Vec::new(),
            team_inventory: Vec::new(),
            ground_instruments,
            hatches: hatch_definitions(),
            lockouts: Vec::new(),
            issues_fixed: 0,
            game_over: false,
            won: false,
        };

        Self {
            state,
            config,
            player_count: 0,
            last_tick_at: now_ms,
            last_issue_spawn_at: now_ms,
            last_instrument_spawn_at: ToolKind::ALL.iter().map(|k| (*k, now_ms)).collect(),
            last_lockout_at: now_ms,
            rng,
            fix_progress: BTreeMap::new(),
            players: BTreeMap::new(),
            doors: BTreeMap::new(),
            next_issue_seq: 0,
            next_instrument_seq: 0,
        }
    }

    pub fn is_over(&self) -> bool {
        self.state.game_over
    }

    /// Advance one second with the default spawn and damage policies.
    pub fn tick(&mut self, now_ms: u64) -> Option<TickReport> {
        self.tick_with(&WeightedSpawn::default(), &AcceleratingDamage, now_ms)
    }

    /// Advance one second. Returns `None` when the match has already ended.
    pub fn tick_with<S: SpawnPolicy, D: DamagePolicy>(
        &mut self,
        spawn: &S,
        damage: &D,
        now_ms: u64,
    ) -> Option<TickReport> {
        if self.state.game_over || self.state.time_remaining_sec == 0 {
            return None;
        }
        let mut report = TickReport::default();

        report.spawned_issue = self.spawn_issue_if_due(spawn, now_ms);

        let outcome = apply_issue_damage(damage, &self.state.issues, self.state.stability, now_ms);
        self.state.stability = outcome.new_stability;
        report.damage = outcome.total_damage;

        report.fixed_issues = self.resolve_fix_completions(now_ms);

        report.spawned_instruments = self.spawn_instruments_if_due(spawn, now_ms);

        self.update_lockouts(now_ms);

        self.state.phase = phase_for_time(self.state.time_remaining_sec);

        if self.state.stability <= stability::MIN {
            self.state.stability = stability::MIN;
            self.state.game_over = true;
            self.state.won = false;
        }

        self.state.time_remaining_sec = self.state.time_remaining_sec.saturating_sub(1);

        if self.state.time_remaining_sec == 0 && self.state.stability > stability::MIN {
            self.state.game_over = true;
            self.state.won = true;
        }

        self.state.next_tick_at = now_ms + self.config.tick_interval_ms;
        self.last_tick_at = now_ms;
        report.ended = self.state.game_over;

        if report.ended {
            log::info!(
                "match {} over: won={} stability={:.1} fixed={}",
                self.state.match_id,
                self.state.won,
                self.state.stability,
                self.state.issues_fixed
            );
        }
        Some(report)
    }

    fn spawn_issue_if_due<S: SpawnPolicy>(&mut self, spawn: &S, now_ms: u64) -> Option<String> {
        if !issue_spawn_due(self.last_issue_spawn_at, now_ms, self.player_count) {
            return None;
        }
        let layer = spawn.issue_layer(&mut self.rng);
        self.next_issue_seq += 1;
        let id = format!("issue_{}", self.next_issue_seq);
        let issue = spawn.create_issue(&mut self.rng, id.clone(), layer, now_ms);
        log::debug!(
            "match {}: spawned {:?} {} on {:?}",
            self.state.match_id,
            issue.kind,
            id,
            layer
        );
        self.state.issues.push(issue);
        self.last_issue_spawn_at = now_ms;
        Some(id)
    }

    fn spawn_instruments_if_due<S: SpawnPolicy>(&mut self, spawn: &S, now_ms: u64) -> Vec<String> {
        let mut spawned = Vec::new();
        for kind in ToolKind::ALL {
            let last = self.last_instrument_spawn_at.get(&kind).copied().unwrap_or(0);
            if !tool_respawn_eligible(
                kind,
                last,
                now_ms,
                self.config.tool_respawn_ms,
                &self.state.ground_instruments,
                &self.state.team_inventory,
            ) {
                continue;
            }
            let layer = spawn.instrument_layer(&mut self.rng);
            self.next_instrument_seq += 1;
            let id = format!("inst_{}", self.next_instrument_seq);
            let instrument =
                spawn.create_instrument(&mut self.rng, id.clone(), kind, layer, now_ms);
            self.state.ground_instruments.push(instrument);
            self.last_instrument_spawn_at.insert(kind, now_ms);
            spawned.push(id);
        }
        spawned
    }
}
