//! Fix coordinator.
//!
//! The issue carries the authoritative `fix_started_at`/`fix_duration_ms`.
//! Per-player [`FixProgress`] entries mirror those values and are
//! resynchronized whenever a helper joins, so every fixer always agrees on
//! when the repair completes.

use serde::{Deserialize, Serialize};

use crate::constants::stability;
use crate::error::FixError;
use crate::runtime::MatchRuntime;
use crate::state::{IssueStatus, ToolKind};

/// Tool selection sent with `start_fix`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ToolChoice {
    /// Fix by hand at the base duration.
    #[default]
    Default,
    ArcaneConduit,
    GearWrench,
    ThermalRegulator,
}

impl ToolChoice {
    pub fn tool(self) -> Option<ToolKind> {
        match self {
            ToolChoice::Default => None,
            ToolChoice::ArcaneConduit => Some(ToolKind::ArcaneConduit),
            ToolChoice::GearWrench => Some(ToolKind::GearWrench),
            ToolChoice::ThermalRegulator => Some(ToolKind::ThermalRegulator),
        }
    }
}

/// One player's view of the repair they are working on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FixProgress {
    pub player_id: String,
    pub issue_id: String,
    pub started_at: u64,
    pub duration_ms: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_used: Option<ToolKind>,
}

/// How a successful `start_fix` attached the player.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FixStart {
    /// First fixer on an active issue.
    Started { duration_ms: f64 },
    /// Helper on an issue already in progress; `duration_ms` is the new
    /// shared duration.
    Joined { duration_ms: f64 },
}

impl FixStart {
    pub fn duration_ms(self) -> f64 {
        match self {
            FixStart::Started { duration_ms } | FixStart::Joined { duration_ms } => duration_ms,
        }
    }
}

impl MatchRuntime {
    /// Begin fixing `issue_id`, or join the repair already under way.
    pub fn start_fix(
        &mut self,
        player_id: &str,
        issue_id: &str,
        choice: ToolChoice,
        now_ms: u64,
    ) -> Result<FixStart, FixError> {
        if self.state.game_over {
            return Err(FixError::MatchOver);
        }
        let player = self
            .players
            .get(player_id)
            .ok_or_else(|| FixError::UnknownPlayer(player_id.to_string()))?;
        if self.fix_progress.contains_key(player_id) {
            return Err(FixError::AlreadyFixing(player_id.to_string()));
        }
        let issue = self
            .state
            .issue(issue_id)
            .ok_or_else(|| FixError::NotFixable(issue_id.to_string()))?;
        let joining = match issue.status {
            IssueStatus::Active => false,
            IssueStatus::InProgress if !issue.fixing_by.iter().any(|id| id == player_id) => true,
            _ => return Err(FixError::NotFixable(issue_id.to_string())),
        };
        if issue.position().distance_sq(player.x, player.y) > self.config.interact_range_sq() {
            return Err(FixError::OutOfRange(issue_id.to_string()));
        }
        if player.layer != issue.layer {
            return Err(FixError::WrongLayer(issue_id.to_string()));
        }

        if joining {
            return Ok(self.join_fix(player_id, issue_id, now_ms));
        }

        // Tool checks only apply to the first fixer; helpers never spend one.
        let tool = choice.tool();
        let inventory_slot = match tool {
            Some(given) => {
                let slot = self
                    .state
                    .team_inventory
                    .iter()
                    .position(|t| *t == given)
                    .ok_or(FixError::ToolNotOwned(given))?;
                if given != issue.required_tool {
                    return Err(FixError::WrongTool {
                        given,
                        required: issue.required_tool,
                    });
                }
                Some(slot)
            }
            None => None,
        };
        let duration_ms = match tool {
            Some(_) => issue.fix_time_with_tool as f64 * 1000.0,
            None => issue.base_fix_time as f64 * 1000.0,
        };

        if let Some(slot) = inventory_slot {
            self.state.team_inventory.remove(slot);
        }
        if let Some(issue) = self.state.issue_mut(issue_id) {
            issue.status = IssueStatus::InProgress;
            issue.fixing_by = vec![player_id.to_string()];
            issue.fix_started_at = Some(now_ms);
            issue.fix_duration_ms = Some(duration_ms);
        }
        self.fix_progress.insert(
            player_id.to_string(),
            FixProgress {
                player_id: player_id.to_string(),
                issue_id: issue_id.to_string(),
                started_at: now_ms,
                duration_ms,
                tool_used: tool,
            },
        );
        log::debug!(
            "match {}: {} started {} ({} ms)",
            self.state.match_id,
            player_id,
            issue_id,
            duration_ms
        );
        Ok(FixStart::Started { duration_ms })
    }

    fn join_fix(&mut self, player_id: &str, issue_id: &str, now_ms: u64) -> FixStart {
        let factor = self.config.helper_remaining_factor;
        let Some(issue) = self.state.issue_mut(issue_id) else {
            return FixStart::Joined { duration_ms: 0.0 };
        };
        let started_at = issue.fix_started_at.unwrap_or(now_ms);
        let duration = issue.fix_duration_ms.unwrap_or(0.0);
        let elapsed = now_ms.saturating_sub(started_at) as f64;
        let remaining = (duration - elapsed).max(0.0);
        let new_duration = elapsed + remaining * factor;

        issue.fix_started_at = Some(started_at);
        issue.fix_duration_ms = Some(new_duration);
        issue.fixing_by.push(player_id.to_string());
        let fixers = issue.fixing_by.clone();

        // A fixer who left after the deadline stays listed on the issue but
        // may already be working on something else.
        for fixer in &fixers {
            if let Some(entry) = self.fix_progress.get_mut(fixer) {
                if entry.issue_id == issue_id {
                    entry.started_at = started_at;
                    entry.duration_ms = new_duration;
                }
            }
        }
        self.fix_progress.insert(
            player_id.to_string(),
            FixProgress {
                player_id: player_id.to_string(),
                issue_id: issue_id.to_string(),
                started_at,
                duration_ms: new_duration,
                tool_used: None,
            },
        );
        log::debug!(
            "match {}: {} joined {} ({} fixers, {} ms)",
            self.state.match_id,
            player_id,
            issue_id,
            fixers.len(),
            new_duration
        );
        FixStart::Joined {
            duration_ms: new_duration,
        }
    }

    /// Explicitly stop fixing. Rejected once the repair has fully elapsed so
    /// the next tick can complete it.
    pub fn cancel_fix(&mut self, player_id: &str, now_ms: u64) -> Result<(), FixError> {
        if !self.fix_progress.contains_key(player_id) {
            return Err(FixError::NotFixing(player_id.to_string()));
        }
        if self.abandon_fix_unless_elapsed(player_id, now_ms) {
            Ok(())
        } else {
            Err(FixError::AlreadyElapsed)
        }
    }

    /// Detach `player_id` from their repair unless it has already reached its
    /// completion time. Returns whether the player was detached.
    pub(crate) fn abandon_fix_unless_elapsed(&mut self, player_id: &str, now_ms: u64) -> bool {
        let Some(progress) = self.fix_progress.get(player_id) else {
            return false;
        };
        let issue_id = progress.issue_id.clone();

        match self.state.issue_mut(&issue_id) {
            Some(issue) if issue.status == IssueStatus::InProgress => {
                if issue.fix_complete_at(now_ms) {
                    return false;
                }
                if issue.remove_fixer(player_id) {
                    log::debug!("{} reverted to active", issue_id);
                }
            }
            // Stale entry: the issue is gone or no longer being repaired.
            _ => {}
        }
        self.fix_progress.remove(player_id);
        true
    }

    /// Complete every in-progress issue whose duration has elapsed. Returns
    /// the ids of the issues fixed, which are removed from the match.
    pub(crate) fn resolve_fix_completions(&mut self, now_ms: u64) -> Vec<String> {
        let mut fixed = Vec::new();
        for issue in self.state.issues.iter_mut() {
            if issue.status != IssueStatus::InProgress || !issue.fix_complete_at(now_ms) {
                continue;
            }
            issue.status = IssueStatus::Fixed;
            self.state.stability =
                (self.state.stability + issue.stability_reward).min(stability::MAX);
            self.state.issues_fixed += 1;
            for fixer in &issue.fixing_by {
                if matches!(self.fix_progress.get(fixer), Some(p) if p.issue_id == issue.id) {
                    self.fix_progress.remove(fixer);
                }
            }
            fixed.push(issue.id.clone());
        }
        self.state.issues.retain(|i| i.status != IssueStatus::Fixed);

        let issues = &self.state.issues;
        self.fix_progress.retain(|_, p| {
            issues
                .iter()
                .any(|i| i.id == p.issue_id && i.status == IssueStatus::InProgress)
        });

        if !fixed.is_empty() {
            log::debug!("match {}: fixed {:?}", self.state.match_id, fixed);
        }
        fixed
    }

    pub fn fix_progress(&self, player_id: &str) -> Option<&FixProgress> {
        self.fix_progress.get(player_id)
    }

    pub fn fixes(&self) -> impl Iterator<Item = &FixProgress> {
        self.fix_progress.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MatchConfig;
    use crate::issues::definition;
    use crate::state::{Issue, IssueKind, Layer};

    const T0: u64 = 0;

    fn issue_at(id: &str, kind: IssueKind, layer: Layer) -> Issue {
        let def = definition(kind);
        Issue {
            id: id.into(),
            kind,
            x: 1600.0,
            y: 1200.0,
            layer,
            spawn_time: T0,
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

    /// A match with one pressure surge at the hub and two players beside it.
    fn setup() -> MatchRuntime {
        let mut m = MatchRuntime::new("fix", 7, MatchConfig::default(), T0);
        m.state.issues.push(issue_at("surge", IssueKind::PressureSurge, Layer::Deck));
        m.join_player("alice", "Alice");
        m.join_player("bob", "Bob");
        m.move_player("alice", 1600.0, 1210.0, T0);
        m.move_player("bob", 1610.0, 1200.0, T0);
        m
    }

    #[test]
    fn test_tool_choice_wire_names() {
        let c: ToolChoice = serde_json::from_str("\"default\"").unwrap();
        assert_eq!(c, ToolChoice::Default);
        let c: ToolChoice = serde_json::from_str("\"gear_wrench\"").unwrap();
        assert_eq!(c.tool(), Some(ToolKind::GearWrench));
    }

    #[test]
    fn test_start_manual_fix() {
        let mut m = setup();
        let start = m.start_fix("alice", "surge", ToolChoice::Default, T0).unwrap();
        assert_eq!(start, FixStart::Started { duration_ms: 15_000.0 });

        let issue = m.state.issue("surge").unwrap();
        assert_eq!(issue.status, IssueStatus::InProgress);
        assert_eq!(issue.fixing_by, vec!["alice".to_string()]);
        assert_eq!(issue.fix_started_at, Some(T0));
        assert_eq!(issue.fix_duration_ms, Some(15_000.0));
        assert_eq!(m.fix_progress("alice").unwrap().tool_used, None);
    }

    #[test]
    fn test_start_with_tool_consumes_one() {
        let mut m = setup();
        m.state.team_inventory = vec![ToolKind::ThermalRegulator, ToolKind::ThermalRegulator];
        let start = m
            .start_fix("alice", "surge", ToolChoice::ThermalRegulator, T0)
            .unwrap();
        assert_eq!(start.duration_ms(), 8_000.0);
        assert_eq!(m.state.team_inventory, vec![ToolKind::ThermalRegulator]);
    }

    #[test]
    fn test_tool_not_owned_and_wrong_tool_reject_without_change() {
        let mut m = setup();
        assert_eq!(
            m.start_fix("alice", "surge", ToolChoice::GearWrench, T0),
            Err(FixError::ToolNotOwned(ToolKind::GearWrench))
        );
        m.state.team_inventory = vec![ToolKind::GearWrench];
        assert_eq!(
            m.start_fix("alice", "surge", ToolChoice::GearWrench, T0),
            Err(FixError::WrongTool {
                given: ToolKind::GearWrench,
                required: ToolKind::ThermalRegulator
            })
        );
        assert_eq!(m.state.team_inventory, vec![ToolKind::GearWrench]);
        assert_eq!(m.state.issue("surge").unwrap().status, IssueStatus::Active);
        assert!(m.fix_progress("alice").is_none());
    }

    #[test]
    fn test_range_and_layer_checks() {
        let mut m = setup();
        m.move_player("alice", 1700.0, 1200.0, T0);
        assert_eq!(
            m.start_fix("alice", "surge", ToolChoice::Default, T0),
            Err(FixError::OutOfRange("surge".into()))
        );
        // Exactly on the radius is allowed
        m.move_player("alice", 1660.0, 1200.0, T0);
        assert!(m.start_fix("alice", "surge", ToolChoice::Default, T0).is_ok());

        m.state
            .issues
            .push(issue_at("hold", IssueKind::CoolantLeak, Layer::Cargo));
        assert_eq!(
            m.start_fix("bob", "hold", ToolChoice::Default, T0),
            Err(FixError::WrongLayer("hold".into()))
        );
    }

    #[test]
    fn test_unknown_player_and_issue() {
        let mut m = setup();
        assert_eq!(
            m.start_fix("ghost", "surge", ToolChoice::Default, T0),
            Err(FixError::UnknownPlayer("ghost".into()))
        );
        assert_eq!(
            m.start_fix("alice", "nope", ToolChoice::Default, T0),
            Err(FixError::NotFixable("nope".into()))
        );
    }

    #[test]
    fn test_already_fixing_and_double_join() {
        let mut m = setup();
        m.state
            .issues
            .push(issue_at("leak", IssueKind::CoolantLeak, Layer::Deck));
        m.start_fix("alice", "surge", ToolChoice::Default, T0).unwrap();
        assert_eq!(
            m.start_fix("alice", "leak", ToolChoice::Default, T0),
            Err(FixError::AlreadyFixing("alice".into()))
        );
    }

    #[test]
    fn test_rejected_when_over() {
        let mut m = setup();
        m.state.game_over = true;
        assert_eq!(
            m.start_fix("alice", "surge", ToolChoice::Default, T0),
            Err(FixError::MatchOver)
        );
    }

    #[test]
    fn test_helper_join_cuts_remaining_by_forty_percent() {
        let mut m = setup();
        m.start_fix("alice", "surge", ToolChoice::Default, 0).unwrap();
        let start = m.start_fix("bob", "surge", ToolChoice::Default, 6_000).unwrap();

        // remaining 9000 * 0.6 = 5400, so 6000 + 5400
        assert_eq!(start, FixStart::Joined { duration_ms: 11_400.0 });
        let issue = m.state.issue("surge").unwrap();
        assert_eq!(issue.fix_started_at, Some(0));
        assert_eq!(issue.fix_duration_ms, Some(11_400.0));
        assert_eq!(issue.fixing_by.len(), 2);
        for id in ["alice", "bob"] {
            let p = m.fix_progress(id).unwrap();
            assert_eq!(p.started_at, 0);
            assert_eq!(p.duration_ms, 11_400.0);
        }
    }

    #[test]
    fn test_helper_never_spends_tool() {
        let mut m = setup();
        m.state.team_inventory = vec![ToolKind::ThermalRegulator];
        m.start_fix("alice", "surge", ToolChoice::Default, 0).unwrap();
        m.start_fix("bob", "surge", ToolChoice::ThermalRegulator, 1_000)
            .unwrap();
        assert_eq!(m.state.team_inventory, vec![ToolKind::ThermalRegulator]);
    }

    #[test]
    fn test_completion_applies_reward_once() {
        let mut m = setup();
        m.state.stability = 90.0;
        m.start_fix("alice", "surge", ToolChoice::Default, 0).unwrap();
        m.start_fix("bob", "surge", ToolChoice::Default, 6_000).unwrap();

        assert!(m.resolve_fix_completions(10_600).is_empty());
        assert_eq!(m.resolve_fix_completions(11_400), vec!["surge".to_string()]);
        assert_eq!(m.state.stability, 95.0);
        assert_eq!(m.state.issues_fixed, 1);
        assert!(m.state.issues.is_empty());
        assert!(m.fix_progress("alice").is_none());
        assert!(m.fix_progress("bob").is_none());

        assert!(m.resolve_fix_completions(12_000).is_empty());
        assert_eq!(m.state.issues_fixed, 1);
    }

    #[test]
    fn test_completion_caps_stability() {
        let mut m = setup();
        m.state.stability = 98.0;
        m.start_fix("alice", "surge", ToolChoice::Default, 0).unwrap();
        m.resolve_fix_completions(15_000);
        assert_eq!(m.state.stability, 100.0);
    }

    #[test]
    fn test_cancel_last_fixer_reverts_issue() {
        let mut m = setup();
        m.start_fix("alice", "surge", ToolChoice::Default, 0).unwrap();
        m.cancel_fix("alice", 5_000).unwrap();
        let issue = m.state.issue("surge").unwrap();
        assert_eq!(issue.status, IssueStatus::Active);
        assert!(issue.fixing_by.is_empty());
        assert_eq!(issue.fix_started_at, None);
        assert_eq!(issue.fix_duration_ms, None);
        assert!(m.fix_progress("alice").is_none());
    }

    #[test]
    fn test_cancel_one_of_two_keeps_progress() {
        let mut m = setup();
        m.start_fix("alice", "surge", ToolChoice::Default, 0).unwrap();
        m.start_fix("bob", "surge", ToolChoice::Default, 6_000).unwrap();
        m.cancel_fix("alice", 7_000).unwrap();
        let issue = m.state.issue("surge").unwrap();
        assert_eq!(issue.status, IssueStatus::InProgress);
        assert_eq!(issue.fixing_by, vec!["bob".to_string()]);
        assert_eq!(issue.fix_duration_ms, Some(11_400.0));
    }

    #[test]
    fn test_late_cancel_is_ignored() {
        let mut m = setup();
        m.start_fix("alice", "surge", ToolChoice::Default, 0).unwrap();
        assert_eq!(m.cancel_fix("alice", 15_000), Err(FixError::AlreadyElapsed));
        assert_eq!(m.state.issue("surge").unwrap().status, IssueStatus::InProgress);
        assert_eq!(m.resolve_fix_completions(15_000).len(), 1);
    }

    #[test]
    fn test_cancel_without_fix() {
        let mut m = setup();
        assert_eq!(
            m.cancel_fix("alice", 0),
            Err(FixError::NotFixing("alice".into()))
        );
    }

    #[test]
    fn test_departed_fixer_keeps_new_repair_through_completion() {
        let mut m = setup();
        m.state
            .issues
            .push(issue_at("leak", IssueKind::CoolantLeak, Layer::Deck));
        m.state
            .issues
            .push(issue_at("drift", IssueKind::MechanicalDrift, Layer::Deck));
        m.start_fix("alice", "surge", ToolChoice::Default, 0).unwrap();

        // Leaves on the deadline: still credited, still listed on the surge.
        m.remove_player("alice", 15_000);
        assert_eq!(
            m.state.issue("surge").unwrap().fixing_by,
            vec!["alice".to_string()]
        );

        m.join_player("alice", "Alice");
        m.move_player("alice", 1600.0, 1210.0, 15_000);
        m.start_fix("alice", "leak", ToolChoice::Default, 15_000).unwrap();

        // A helper on the surge must not resync alice's leak repair.
        assert!(matches!(
            m.start_fix("bob", "surge", ToolChoice::Default, 15_000),
            Ok(FixStart::Joined { .. })
        ));
        let leak_duration = m.state.issue("leak").unwrap().fix_duration_ms.unwrap();
        let p = m.fix_progress("alice").unwrap();
        assert_eq!(p.issue_id, "leak");
        assert_eq!(p.duration_ms, leak_duration);

        assert_eq!(m.resolve_fix_completions(15_000), vec!["surge".to_string()]);
        assert_eq!(m.fix_progress("alice").unwrap().issue_id, "leak");
        assert!(m.fix_progress("bob").is_none());
        assert_eq!(m.state.issue("leak").unwrap().status, IssueStatus::InProgress);
        assert_eq!(
            m.start_fix("alice", "drift", ToolChoice::Default, 15_000),
            Err(FixError::AlreadyFixing("alice".into()))
        );
    }

    #[test]
    fn test_stale_progress_discarded() {
        let mut m = setup();
        m.start_fix("alice", "surge", ToolChoice::Default, 0).unwrap();
        m.state.issues.clear();
        m.resolve_fix_completions(1_000);
        assert!(m.fix_progress("alice").is_none());
    }
}
