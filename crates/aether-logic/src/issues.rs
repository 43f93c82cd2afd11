//! Issue definitions and the damage model.
//!
//! Damage per second is a step function of issue age. The curve is not
//! monotonic: a fresh issue hurts at 0.4/s for ten seconds, drops to 0.16/s,
//! then ramps back up to 0.8/s. Only `Active` issues deal damage, so starting
//! a repair immediately stops the bleed.

use crate::constants::stability;
use crate::state::{Issue, IssueKind, IssueStatus, ToolKind};

/// Static per-kind repair parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IssueDefinition {
    /// Seconds to fix by hand.
    pub base_fix_secs: u32,
    /// Seconds to fix with the required tool.
    pub tool_fix_secs: u32,
    pub required_tool: ToolKind,
    /// Stability restored on completion.
    pub stability_reward: f64,
}

pub fn definition(kind: IssueKind) -> IssueDefinition {
    use IssueKind::*;
    use ToolKind::*;
    let (base, tool, required, reward) = match kind {
        PressureSurge => (15, 8, ThermalRegulator, 5.0),
        CoolantLeak => (14, 8, GearWrench, 4.0),
        MechanicalDrift => (16, 9, GearWrench, 5.0),
        CapacitorOverload => (18, 10, ArcaneConduit, 7.0),
        FrictionFire => (14, 8, ThermalRegulator, 4.0),
        ControlCorruption => (20, 11, ArcaneConduit, 8.0),
    };
    IssueDefinition {
        base_fix_secs: base,
        tool_fix_secs: tool,
        required_tool: required,
        stability_reward: reward,
    }
}

/// (max age in seconds, damage per second). Ages past the last bound use
/// [`LATE_DPS`].
pub const DAMAGE_CURVE: [(f64, f64); 5] = [
    (10.0, 0.4),
    (15.0, 0.16),
    (20.0, 0.32),
    (25.0, 0.48),
    (30.0, 0.64),
];

pub const LATE_DPS: f64 = 0.8;

pub fn damage_per_second_for_age(age_secs: f64) -> f64 {
    DAMAGE_CURVE
        .iter()
        .find(|(max_age, _)| age_secs <= *max_age)
        .map(|(_, dps)| *dps)
        .unwrap_or(LATE_DPS)
}

/// How much an issue hurts stability per second.
pub trait DamagePolicy {
    fn damage_per_second(&self, issue: &Issue, now_ms: u64) -> f64;
}

/// Default policy: the age-stepped curve, active issues only.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceleratingDamage;

impl DamagePolicy for AcceleratingDamage {
    fn damage_per_second(&self, issue: &Issue, now_ms: u64) -> f64 {
        if issue.status != IssueStatus::Active {
            return 0.0;
        }
        let age_secs = now_ms.saturating_sub(issue.spawn_time) as f64 / 1000.0;
        damage_per_second_for_age(age_secs)
    }
}

/// Result of applying one second of damage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DamageOutcome {
    pub new_stability: f64,
    pub total_damage: f64,
}

/// Sum damage over all issues and subtract from stability, floored at 0.
pub fn apply_issue_damage<D: DamagePolicy>(
    policy: &D,
    issues: &[Issue],
    current_stability: f64,
    now_ms: u64,
) -> DamageOutcome {
    let total_damage: f64 = issues
        .iter()
        .map(|i| policy.damage_per_second(i, now_ms))
        .sum();
    DamageOutcome {
        new_stability: (current_stability - total_damage).max(stability::MIN),
        total_damage,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Layer;

    fn make_issue(spawn_time: u64, status: IssueStatus) -> Issue {
        let def = definition(IssueKind::PressureSurge);
        Issue {
            id: "issue_test_1".into(),
            kind: IssueKind::PressureSurge,
            x: 1600.0,
            y: 1200.0,
            layer: Layer::Deck,
            spawn_time,
            base_fix_time: def.base_fix_secs,
            fix_time_with_tool: def.tool_fix_secs,
            required_tool: def.required_tool,
            stability_reward: def.stability_reward,
            status,
            required_players: 1,
            fixing_by: Vec::new(),
            fix_started_at: None,
            fix_duration_ms: None,
        }
    }

    #[test]
    fn test_tool_time_shorter_for_every_kind() {
        for kind in IssueKind::ALL {
            let def = definition(kind);
            assert!(def.tool_fix_secs < def.base_fix_secs, "{:?}", kind);
            assert!(def.stability_reward > 0.0);
        }
    }

    #[test]
    fn test_curve_breakpoints() {
        assert_eq!(damage_per_second_for_age(0.0), 0.4);
        assert_eq!(damage_per_second_for_age(10.0), 0.4);
        assert_eq!(damage_per_second_for_age(10.001), 0.16);
        assert_eq!(damage_per_second_for_age(15.0), 0.16);
        assert_eq!(damage_per_second_for_age(15.001), 0.32);
        assert_eq!(damage_per_second_for_age(20.0), 0.32);
        assert_eq!(damage_per_second_for_age(25.0), 0.48);
        assert_eq!(damage_per_second_for_age(30.0), 0.64);
        assert_eq!(damage_per_second_for_age(30.001), 0.8);
        assert_eq!(damage_per_second_for_age(600.0), 0.8);
    }

    #[test]
    fn test_only_active_issues_hurt() {
        let policy = AcceleratingDamage;
        assert_eq!(
            policy.damage_per_second(&make_issue(0, IssueStatus::InProgress), 5_000),
            0.0
        );
        assert_eq!(
            policy.damage_per_second(&make_issue(0, IssueStatus::Fixed), 30_000),
            0.0
        );
        assert_eq!(
            policy.damage_per_second(&make_issue(1_000, IssueStatus::Active), 1_000),
            0.4
        );
    }

    #[test]
    fn test_fresh_issue_one_tick() {
        let issues = vec![make_issue(5_000, IssueStatus::Active)];
        let out = apply_issue_damage(&AcceleratingDamage, &issues, 100.0, 5_000);
        assert!((out.total_damage - 0.4).abs() < 1e-9);
        assert!((out.new_stability - 99.6).abs() < 1e-9);
    }

    #[test]
    fn test_damage_sums_and_floors() {
        let issues = vec![
            make_issue(0, IssueStatus::Active),
            make_issue(0, IssueStatus::Active),
            make_issue(0, IssueStatus::InProgress),
        ];
        let out = apply_issue_damage(&AcceleratingDamage, &issues, 1.0, 60_000);
        assert!((out.total_damage - 1.6).abs() < 1e-9);
        assert_eq!(out.new_stability, 0.0);
    }
}
