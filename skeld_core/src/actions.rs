//! Agent action handlers.
//!
//! Each handler validates its full precondition list before touching state;
//! a rejection leaves the game exactly as it was.

use crate::agent::{Activity, ActiveTask, LifeState, Role};
use crate::error::ActionRejected;
use crate::events::{Details, EventKind};
use crate::game::Game;
use crate::meeting::Meeting;
use crate::movement::{MoveIntent, PathStart};
use crate::sabotage::SabotageKind;
use nalgebra::Vector2;
use serde_json::{json, Map, Value};
use tracing::{debug, info};

impl Game {
    pub(crate) fn announce_arrival(&self, idx: usize) {
        let room = self.agents[idx]
            .location()
            .map(|wp| self.graph.name(wp))
            .unwrap_or("Unknown");
        debug!("[{}] Reached '{}'", self.agents[idx].id, room);
        self.emit(
            idx,
            EventKind::ReachLocation,
            Details::text(format!("you have reached {}", room)),
        );
    }

    pub(crate) fn act_move(&mut self, idx: usize, details: &str) -> Result<(), ActionRejected> {
        let name = details.trim();
        if name.is_empty() {
            return Err(ActionRejected::MissingParameter("target room"));
        }
        let target = self
            .graph
            .find_by_name(name)
            .ok_or_else(|| ActionRejected::UnknownWaypoint(name.to_string()))?;

        let agent = &mut self.agents[idx];
        if agent.is_venting() {
            return Err(ActionRejected::Venting);
        }
        let start = agent.follower.move_to(target, &self.graph, MoveIntent::Command)?;

        if let Some(task) = agent.stop_task() {
            info!(
                "[{}] Task at '{}' interrupted, not completed",
                agent.id,
                self.graph.name(task.location)
            );
        }

        match start {
            PathStart::Installed => {
                agent.activity = Activity::Moving;
                debug!("[{}] Moving to '{}'", agent.id, self.graph.name(target));
            }
            PathStart::Completed(_) => {
                agent.activity = Activity::Idle;
                self.announce_arrival(idx);
            }
        }
        Ok(())
    }

    pub(crate) fn act_kill(&mut self, idx: usize) -> Result<(), ActionRejected> {
        let killer = &self.agents[idx];
        if !killer.is_impostor() {
            return Err(ActionRejected::WrongRole {
                action: "kill",
                required: Role::Impostor,
            });
        }
        if !killer.kill_cooldown.is_ready() {
            return Err(ActionRejected::Cooldown {
                timer: killer.kill_cooldown.timer(),
                max: killer.kill_cooldown.max(),
            });
        }
        let target = self.kill_target(idx).ok_or(ActionRejected::NoTarget {
            range: self.kill_range(idx),
        })?;

        let victim = &mut self.agents[target];
        victim.life = LifeState::Dead;
        victim.stop_task();
        victim.follower.clear_path();
        victim.activity = Activity::Idle;

        self.notify_kill_witnesses(idx, target);

        self.agents[idx].kill_cooldown.reset();
        let victim_id = self.agents[target].id.to_string();
        info!("[{}] (IMPOSTOR) killed {}", self.agents[idx].id, victim_id);
        self.emit(
            idx,
            EventKind::CompleteKill,
            Details::text(format!("you have killed {}", victim_id)),
        );

        self.check_win();
        Ok(())
    }

    /// Living crewmates in the killer's room see the kill, unless the lights
    /// are out.
    fn notify_kill_witnesses(&self, killer: usize, victim: usize) {
        if self.sabotage.is_electrical_active() {
            return;
        }
        let room = self.agents[killer].location();
        let killer_id = self.agents[killer].id.to_string();
        let victim_id = self.agents[victim].id.to_string();
        let room_name = room.map(|wp| self.graph.name(wp)).unwrap_or("Unknown");

        for (i, witness) in self.agents.iter().enumerate() {
            if i == killer || i == victim || !witness.is_alive() || witness.is_impostor() {
                continue;
            }
            if room.is_some() && witness.location() != room {
                continue;
            }
            let mut extras = Map::new();
            extras.insert("killer".to_string(), Value::from(killer_id.as_str()));
            extras.insert("victim".to_string(), Value::from(victim_id.as_str()));
            extras.insert("room".to_string(), Value::from(room_name));
            self.emit_with(
                i,
                EventKind::SeeKill,
                Details::text(format!("you saw {} kill {}", killer_id, victim_id)),
                extras,
            );
        }
    }

    pub(crate) fn act_vent(&mut self, idx: usize, details: &str) -> Result<(), ActionRejected> {
        let agent = &self.agents[idx];
        if !agent.is_impostor() {
            return Err(ActionRejected::WrongRole {
                action: "vent",
                required: Role::Impostor,
            });
        }
        let name = details.trim();
        if name.is_empty() {
            return Err(ActionRejected::MissingParameter("target vent"));
        }
        let target = self
            .graph
            .find_by_name(name)
            .ok_or_else(|| ActionRejected::UnknownWaypoint(name.to_string()))?;
        let origin = agent.location().ok_or(ActionRejected::NoLocation)?;

        let origin_name = self.graph.name(origin).to_string();
        let target_name = self.graph.name(target).to_string();
        if !self.vents.is_vent(origin) {
            return Err(ActionRejected::NotAVent(origin_name));
        }
        if target == origin {
            return Err(ActionRejected::SameVent(target_name));
        }
        if !self.vents.are_connected(origin, target) {
            return Err(ActionRejected::VentsNotConnected {
                from: origin_name,
                to: target_name,
            });
        }

        let id = agent.id.to_string();
        self.notify_nearby(
            idx,
            agent.position(),
            EventKind::SeeEnterVent,
            &format!("{} was seen entering a vent at {}", id, origin_name),
        );

        let agent = &mut self.agents[idx];
        agent.stop_task();
        agent.follower.clear_path();
        agent.activity = Activity::Venting;
        agent.follower.snap_to_node(target, &self.graph);

        self.notify_nearby(
            idx,
            self.graph.position(target),
            EventKind::SeeExitVent,
            &format!("{} was seen exiting a vent at {}", id, target_name),
        );
        self.agents[idx].activity = Activity::Idle;

        info!("[{}] Vented from '{}' to '{}'", id, origin_name, target_name);
        self.emit(
            idx,
            EventKind::Vent,
            Details::text(format!("you have vented from {} to {}", origin_name, target_name)),
        );
        Ok(())
    }

    /// Every other living agent whose own near radius covers `origin`.
    fn notify_nearby(&self, actor: usize, origin: Vector2<f64>, kind: EventKind, text: &str) {
        for (i, agent) in self.agents.iter().enumerate() {
            if i == actor || !agent.is_alive() {
                continue;
            }
            if (agent.position() - origin).norm() <= agent.near_radius {
                self.emit(i, kind.clone(), Details::text(text));
            }
        }
    }

    pub(crate) fn act_sabotage(&mut self, idx: usize, details: &str) -> Result<(), ActionRejected> {
        let agent = &self.agents[idx];
        if !agent.is_impostor() {
            return Err(ActionRejected::WrongRole {
                action: "sabotage",
                required: Role::Impostor,
            });
        }
        if details.trim().is_empty() {
            return Err(ActionRejected::MissingParameter("sabotage type"));
        }
        let kind: SabotageKind = details.parse()?;
        if !agent.sabotage_cooldown.is_ready() {
            return Err(ActionRejected::Cooldown {
                timer: agent.sabotage_cooldown.timer(),
                max: agent.sabotage_cooldown.max(),
            });
        }

        self.sabotage.start(kind)?;
        self.agents[idx].sabotage_cooldown.reset();

        let text = match kind {
            SabotageKind::Electrical => "electrical sabotage has been triggered, lights are out",
            SabotageKind::Reactor => "reactor meltdown has been triggered, fix it before time runs out",
            SabotageKind::Oxygen => "oxygen sabotage has been triggered, fix it before time runs out",
        };
        self.broadcast_living(EventKind::Sabotage, Details::text(text));
        Ok(())
    }

    pub(crate) fn act_report(&mut self, idx: usize) -> Result<(), ActionRejected> {
        let occupants = self.occupants();
        let meeting = self.meeting.try_report(idx, &occupants)?;
        self.open_meeting(meeting, EventKind::BodyFound);
        Ok(())
    }

    pub(crate) fn act_call_meeting(&mut self, idx: usize) -> Result<(), ActionRejected> {
        let occupants = self.occupants();
        let meeting = self.meeting.try_button(idx, &occupants)?;
        self.open_meeting(meeting, EventKind::EmergencyMeeting);
        Ok(())
    }

    /// Drops whatever was queued and tells every living agent about the
    /// meeting.
    fn open_meeting(&mut self, meeting: Meeting, kind: EventKind) {
        let dropped = self.outbox.clear();
        if dropped > 0 {
            debug!("Cleared {} queued events for meeting", dropped);
        }

        let caller = self.agents[meeting.caller].id.to_string();
        let mut payload = Map::new();
        payload.insert("caller".to_string(), Value::from(caller.as_str()));
        if let Some(body) = meeting.body {
            let body_id = self.agents[body].id.to_string();
            info!("[{}] Reported the body of {}", caller, body_id);
            payload.insert("body".to_string(), Value::from(body_id));
        } else {
            info!("[{}] Called an emergency meeting", caller);
        }
        payload.insert("alivePlayers".to_string(), json!(self.living_ids()));

        self.broadcast_living(kind, Details::Json(payload));
    }

    pub(crate) fn act_security(&mut self, idx: usize) -> Result<(), ActionRejected> {
        let occupants = self.occupants();
        let visible = self.info.security_feed(idx, &occupants, &self.graph)?;
        let names: Vec<String> = visible
            .iter()
            .map(|&i| self.agents[i].id.to_string())
            .collect();

        let text = if names.is_empty() {
            "you are viewing the security cameras! nobody is on camera".to_string()
        } else {
            format!("you are viewing the security cameras! on camera: {}", names.join(", "))
        };
        let mut extras = Map::new();
        extras.insert("visible".to_string(), json!(names));
        self.emit_with(idx, EventKind::Security, Details::text(text), extras);
        Ok(())
    }

    pub(crate) fn act_admin(&mut self, idx: usize) -> Result<(), ActionRejected> {
        let occupants = self.occupants();
        let counts = self.info.admin_map(idx, &occupants, &self.graph)?;

        let summary: Vec<String> = counts
            .iter()
            .map(|(room, n)| format!("{}: {}", room, n))
            .collect();
        let text = format!("you are viewing the admin map. {}", summary.join(", "));
        let mut extras = Map::new();
        extras.insert("rooms".to_string(), json!(counts));
        self.emit_with(idx, EventKind::Admin, Details::text(text), extras);
        Ok(())
    }

    pub(crate) fn act_task(&mut self, idx: usize) -> Result<(), ActionRejected> {
        let agent = &mut self.agents[idx];
        if agent.is_venting() {
            return Err(ActionRejected::Venting);
        }
        let room = agent.location().ok_or(ActionRejected::NoLocation)?;
        let category = agent
            .tasks
            .category_of(room)
            .ok_or_else(|| ActionRejected::NotAssignedTask(self.graph.name(room).to_string()))?;
        let duration = self.tuning.task_duration(category);

        if let Some(previous) = agent.stop_task() {
            info!(
                "[{}] Task at '{}' interrupted, not completed",
                agent.id,
                self.graph.name(previous.location)
            );
        }
        agent.follower.clear_path();
        agent.active_task = Some(ActiveTask {
            location: room,
            category,
            remaining: duration,
        });
        agent.activity = Activity::DoingTask;
        info!(
            "[{}] Doing {} task at '{}', {}s to complete",
            agent.id,
            category,
            self.graph.name(room),
            duration
        );
        Ok(())
    }

    pub(crate) fn act_stop_task(&mut self, idx: usize) -> Result<(), ActionRejected> {
        let agent = &mut self.agents[idx];
        let task = agent.stop_task().ok_or(ActionRejected::NoActiveTask)?;
        info!(
            "[{}] Task at '{}' stopped, not completed",
            agent.id,
            self.graph.name(task.location)
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::agent::{Activity, LifeState};
    use crate::error::ActionRejected;
    use crate::protocol::{ActionRecord, EventEnvelope};
    use crate::sabotage::SabotageKind;
    use crate::testing::{drain, small_game};
    use approx::assert_relative_eq;
    use serde_json::{json, Value};

    fn act(agent: &str, kind: &str, details: &str) -> ActionRecord {
        ActionRecord::new(agent, kind, details)
    }

    fn kinds_for(events: &[EventEnvelope], agent: &str) -> Vec<String> {
        events
            .iter()
            .filter(|e| e.agent == agent)
            .map(|e| e.event.kind.clone())
            .collect()
    }

    #[test]
    fn test_move_walks_and_reports_arrival() {
        let mut game = small_game();
        drain(&game);
        game.apply(&act("Blue", "move", "admin")).unwrap();
        assert_eq!(game.agent("Blue").unwrap().activity, Activity::Moving);

        // Cafeteria → Hallway → Admin is 20 units at 2 u/s.
        for _ in 0..120 {
            game.tick(0.1);
        }
        let blue = game.agent("Blue").unwrap();
        assert_eq!(blue.activity, Activity::Idle);
        assert_eq!(blue.location(), game.graph().find_by_name("Admin"));
        assert_relative_eq!(blue.position().x, 10.0, epsilon = 0.1);

        let events = drain(&game);
        let arrivals: Vec<_> = events
            .iter()
            .filter(|e| e.agent == "Blue" && e.event.kind == "reachLocation")
            .collect();
        assert_eq!(arrivals.len(), 1);
        assert!(arrivals[0].event.details.starts_with("you have reached Admin"));
    }

    #[test]
    fn test_move_to_current_room_completes_at_once() {
        let mut game = small_game();
        drain(&game);
        game.apply(&act("Blue", "move", "Cafeteria")).unwrap();
        assert_eq!(game.agent("Blue").unwrap().activity, Activity::Idle);
        assert_eq!(kinds_for(&drain(&game), "Blue"), vec!["reachLocation".to_string()]);
    }

    #[test]
    fn test_move_rejections_leave_state() {
        let mut game = small_game();
        assert_eq!(
            game.apply(&act("Blue", "move", "  ")),
            Err(ActionRejected::MissingParameter("target room"))
        );
        assert!(matches!(
            game.apply(&act("Blue", "move", "Bridge")),
            Err(ActionRejected::UnknownWaypoint(_))
        ));
        assert!(matches!(
            game.apply(&act("Blue", "move", "Dead Drop")),
            Err(ActionRejected::NoPath { .. })
        ));
        let blue = game.agent("Blue").unwrap();
        assert_eq!(blue.activity, Activity::Idle);
        assert!(!blue.follower.is_moving());
    }

    #[test]
    fn test_move_interrupts_task() {
        let mut game = small_game();
        let room = game.agent("Blue").unwrap().tasks.short[0];
        let room_name = game.graph().name(room).to_string();
        game.place_agent("Blue", &room_name).unwrap();
        game.apply(&act("Blue", "task", "")).unwrap();

        game.apply(&act("Blue", "move", "Cafeteria")).unwrap();
        let blue = game.agent("Blue").unwrap();
        assert!(blue.active_task.is_none());
        assert_eq!(blue.activity, Activity::Moving);
        assert!(blue.tasks.short.contains(&room));
    }

    #[test]
    fn test_kill_round_trip() {
        let mut game = small_game();
        game.place_agent("Red", "Electrical").unwrap();
        game.place_agent("Blue", "Electrical").unwrap();
        game.place_agent("Green", "Electrical").unwrap();
        game.place_agent("Yellow", "Storage").unwrap();

        // Green starts walking out; after a second it is ~2 units away but
        // still counts as standing in Electrical.
        game.apply(&act("Green", "move", "Hallway")).unwrap();
        for _ in 0..10 {
            game.tick(0.1);
        }
        drain(&game);

        game.apply(&act("Red", "kill", "")).unwrap();

        assert_eq!(game.agent("Blue").unwrap().life, LifeState::Dead);
        assert_eq!(game.agent("Green").unwrap().life, LifeState::Alive);
        let red = game.agent("Red").unwrap();
        assert_eq!(red.kill_cooldown.timer(), 0.0);
        assert!(!red.kill_cooldown.is_ready());

        let events = drain(&game);
        assert_eq!(kinds_for(&events, "Red"), vec!["completeKill".to_string()]);
        assert!(kinds_for(&events, "Yellow").is_empty());
        let witnessed: Vec<_> = events
            .iter()
            .filter(|e| e.agent == "Green" && e.event.kind == "seeKill")
            .collect();
        assert_eq!(witnessed.len(), 1);
        assert_eq!(witnessed[0].state.extras["killer"], json!("Red"));
        assert_eq!(witnessed[0].state.extras["victim"], json!("Blue"));
        assert!(game.outcome().is_none());
    }

    #[test]
    fn test_kill_preconditions() {
        let mut game = small_game();
        assert!(matches!(
            game.apply(&act("Blue", "kill", "")),
            Err(ActionRejected::WrongRole { .. })
        ));

        game.place_agent("Red", "Reactor").unwrap();
        assert!(matches!(
            game.apply(&act("Red", "kill", "")),
            Err(ActionRejected::NoTarget { .. })
        ));

        game.place_agent("Red", "Cafeteria").unwrap();
        if let Some(red) = game.agent_mut("Red") {
            red.kill_cooldown.set(12.0);
        }
        assert!(matches!(
            game.apply(&act("Red", "kill", "")),
            Err(ActionRejected::Cooldown { .. })
        ));
        assert!(game.agents().iter().all(|a| a.is_alive()));
    }

    #[test]
    fn test_no_witnesses_in_the_dark() {
        let mut game = small_game();
        game.place_agent("Red", "Storage").unwrap();
        game.place_agent("Blue", "Storage").unwrap();
        game.place_agent("Green", "Storage").unwrap();
        game.sabotage.start(SabotageKind::Electrical).unwrap();
        drain(&game);

        game.apply(&act("Red", "kill", "")).unwrap();
        assert_eq!(game.agent("Blue").unwrap().life, LifeState::Dead);
        let events = drain(&game);
        assert!(kinds_for(&events, "Green").is_empty());
    }

    #[test]
    fn test_vent_travel() {
        let mut game = small_game();
        game.place_agent("Red", "Electrical").unwrap();
        game.place_agent("Blue", "Electrical").unwrap();
        game.place_agent("Yellow", "Admin").unwrap();
        drain(&game);

        game.apply(&act("Red", "vent", "Admin")).unwrap();
        let red = game.agent("Red").unwrap();
        assert_eq!(red.location(), game.graph().find_by_name("Admin"));
        assert_eq!(red.activity, Activity::Idle);

        let events = drain(&game);
        assert_eq!(kinds_for(&events, "Blue"), vec!["seeEnterVent".to_string()]);
        assert_eq!(kinds_for(&events, "Yellow"), vec!["seeExitVent".to_string()]);
        let vent: Vec<_> = events.iter().filter(|e| e.agent == "Red").collect();
        assert_eq!(vent.len(), 1);
        assert_eq!(vent[0].event.kind, "vent");
        assert!(vent[0]
            .event
            .details
            .starts_with("you have vented from Electrical to Admin"));
    }

    #[test]
    fn test_vent_rejections() {
        let mut game = small_game();
        game.place_agent("Red", "Electrical").unwrap();

        assert!(matches!(
            game.apply(&act("Red", "vent", "Security")),
            Err(ActionRejected::VentsNotConnected { .. })
        ));
        assert!(matches!(
            game.apply(&act("Red", "vent", "Electrical")),
            Err(ActionRejected::SameVent(_))
        ));
        assert!(matches!(
            game.apply(&act("Blue", "vent", "Admin")),
            Err(ActionRejected::WrongRole { .. })
        ));
        assert_eq!(
            game.agent("Red").unwrap().location(),
            game.graph().find_by_name("Electrical")
        );

        game.place_agent("Red", "Storage").unwrap();
        assert!(matches!(
            game.apply(&act("Red", "vent", "Admin")),
            Err(ActionRejected::NotAVent(_))
        ));
    }

    #[test]
    fn test_sabotage_broadcast_and_exclusion() {
        let mut game = small_game();
        drain(&game);

        game.apply(&act("Red", "sabotage", "o2")).unwrap();
        assert_eq!(game.sabotage().current(), Some(SabotageKind::Oxygen));
        assert_eq!(game.agent("Red").unwrap().sabotage_cooldown.timer(), 0.0);
        let events = drain(&game);
        assert_eq!(events.iter().filter(|e| e.event.kind == "sabotage").count(), 4);

        assert!(matches!(
            game.apply(&act("Red", "sabotage", "reactor")),
            Err(ActionRejected::Cooldown { .. })
        ));
        if let Some(red) = game.agent_mut("Red") {
            red.sabotage_cooldown.set(30.0);
        }
        let remaining = game.sabotage().time_remaining();
        assert_eq!(
            game.apply(&act("Red", "sabotage", "REACTOR")),
            Err(ActionRejected::SabotageActive(SabotageKind::Oxygen))
        );
        assert_eq!(game.sabotage().current(), Some(SabotageKind::Oxygen));
        assert_eq!(game.sabotage().time_remaining(), remaining);

        assert!(matches!(
            game.apply(&act("Red", "sabotage", "lights")),
            Err(ActionRejected::UnknownSabotage(_))
        ));
        assert!(matches!(
            game.apply(&act("Blue", "sabotage", "o2")),
            Err(ActionRejected::WrongRole { .. })
        ));
    }

    #[test]
    fn test_report_clears_queue_and_broadcasts() {
        let mut game = small_game();
        game.place_agent("Red", "Storage").unwrap();
        game.place_agent("Blue", "Storage").unwrap();
        game.apply(&act("Red", "kill", "")).unwrap();
        game.place_agent("Red", "Reactor").unwrap();
        game.place_agent("Green", "Storage").unwrap();
        assert!(!game.outbox().is_empty());

        assert_eq!(
            game.apply(&act("Yellow", "report", "")),
            Err(ActionRejected::NoBody)
        );
        game.apply(&act("Green", "report", "")).unwrap();
        assert!(game.meeting().is_active());
        assert!(game.outbox().has_priority());

        let events = drain(&game);
        assert_eq!(events.len(), 3);
        assert!(events.iter().all(|e| e.event.kind == "bodyFound"));
        let payload: Value = serde_json::from_str(&events[0].event.details).unwrap();
        assert_eq!(payload["caller"], json!("Green"));
        assert_eq!(payload["body"], json!("Blue"));
        assert_eq!(payload["alivePlayers"], json!(["Red", "Green", "Yellow"]));

        assert_eq!(
            game.apply(&act("Yellow", "callMeeting", "")),
            Err(ActionRejected::MeetingActive)
        );
    }

    #[test]
    fn test_emergency_button_only_in_cafeteria() {
        let mut game = small_game();
        game.place_agent("Yellow", "Storage").unwrap();
        assert!(matches!(
            game.apply(&act("Yellow", "callmeeting", "")),
            Err(ActionRejected::WrongRoom { .. })
        ));

        drain(&game);
        game.apply(&act("Blue", "CALLMEETING", "")).unwrap();
        let events = drain(&game);
        assert_eq!(events.len(), 4);
        let payload: Value = serde_json::from_str(&events[0].event.details).unwrap();
        assert_eq!(payload["caller"], json!("Blue"));
        assert!(payload.get("body").is_none());
    }

    #[test]
    fn test_security_and_admin() {
        let mut game = small_game();
        game.place_agent("Blue", "Security").unwrap();
        game.place_agent("Green", "Hallway").unwrap();
        game.place_agent("Yellow", "Admin").unwrap();
        drain(&game);

        game.apply(&act("Blue", "security", "")).unwrap();
        game.apply(&act("Yellow", "admin", "")).unwrap();
        assert!(matches!(
            game.apply(&act("Green", "admin", "")),
            Err(ActionRejected::WrongRoom { .. })
        ));

        let events = drain(&game);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event.kind, "security");
        assert_eq!(events[0].state.extras["visible"], json!(["Green"]));
        assert_eq!(events[1].event.kind, "admin");
        assert_eq!(events[1].state.extras["rooms"]["Cafeteria"], json!(1));
        assert_eq!(events[1].state.extras["rooms"]["Admin"], json!(1));
    }

    #[test]
    fn test_task_requires_assigned_room() {
        let mut game = small_game();
        assert!(matches!(
            game.apply(&act("Blue", "task", "")),
            Err(ActionRejected::NotAssignedTask(_))
        ));
        assert!(matches!(
            game.apply(&act("Red", "task", "")),
            Err(ActionRejected::NotAssignedTask(_))
        ));
    }

    #[test]
    fn test_new_task_interrupts_previous() {
        let mut game = small_game();
        let blue = game.agent("Blue").unwrap();
        let first = game.graph().name(blue.tasks.short[0]).to_string();
        let second = game.graph().name(blue.tasks.common[0]).to_string();

        game.place_agent("Blue", &first).unwrap();
        game.apply(&act("Blue", "task", "")).unwrap();
        game.place_agent("Blue", &second).unwrap();
        game.apply(&act("Blue", "task", "")).unwrap();

        let blue = game.agent("Blue").unwrap();
        let task = blue.active_task.as_ref().unwrap();
        assert_eq!(game.graph().name(task.location), second);
        assert!(blue.tasks.completed().is_empty());
    }
}
