//! End-to-end lock sessions through the production runtime.
//!
//! Each scenario scripts key presses against a simulated multi-surface
//! display and checks the resulting world with an oracle.

use scrlock_core::{KeyPress, LockState, Screen, SessionConfig, key::keysym};
use scrlock_harness::scenario::Scenario;

#[test]
fn edit_then_unlock_releases_every_surface_once() {
    Scenario::new("abc-backspace-d")
        .surfaces(2)
        .password("ad")
        .type_text("abc")
        .backspace()
        .type_text("d")
        .enter()
        .oracle(Box::new(|world| {
            assert!(world.unlocked());
            assert_eq!(world.verifications(), 1);

            let outcome = world.outcome().ok_or("no outcome")?;
            assert_eq!(outcome.released, 2);
            assert_eq!(outcome.failed_attempts, 0);

            for surface in 0..2 {
                assert!(world.record().released_once(surface), "surface {surface}");
                // Idle paint, then a single swap to active on the first key.
                assert_eq!(
                    world.draws_on(surface),
                    vec![&Screen::Password { active: false }, &Screen::Password { active: true }]
                );
            }
            assert!(world.all_released());
            Ok(())
        }))
        .run()
        .expect("scenario should succeed");
}

#[test]
fn message_is_truncated_saved_and_mode_reverts() {
    let fifty_one = "m".repeat(51);

    Scenario::new("long-message")
        .ctrl_space()
        .type_text(&fifty_one)
        .enter()
        .type_text("secret")
        .enter()
        .oracle(Box::new(|world| {
            assert!(world.unlocked());

            let messages = world.messages();
            assert_eq!(messages.len(), 1);
            let record = &messages[0];
            assert!(record.starts_with('['), "{record}");
            assert!(record.ends_with(&format!("] {}\n", "m".repeat(50))), "{record}");

            let draws = world.draws_on(0);
            assert_eq!(draws[1], &Screen::Message { text: String::new(), remaining: 50 });
            assert!(draws.contains(&&Screen::Message { text: "m".repeat(50), remaining: 0 }));
            // The 51st key is rejected and does not redraw: 50 countdown
            // paints, then the password screen once the message is sent.
            let message_paints =
                draws.iter().filter(|s| matches!(s, Screen::Message { .. })).count();
            assert_eq!(message_paints, 51);
            let after = draws.iter().position(|s| s == &&Screen::Message { text: "m".repeat(50), remaining: 0 });
            assert_eq!(draws.get(after.ok_or("no full message")? + 1), Some(&&Screen::Password { active: false }));
            Ok(())
        }))
        .run()
        .expect("scenario should succeed");
}

#[test]
fn wrong_attempts_spawn_and_reap_one_job_each() {
    Scenario::new("three-wrong")
        .surfaces(2)
        .type_text("one")
        .enter()
        .type_text("two")
        .enter()
        .type_text("three")
        .enter()
        .type_text("secret")
        .enter()
        .oracle(Box::new(|world| {
            assert!(world.unlocked());
            assert_eq!(world.side_effects_launched(), 3);
            assert_eq!(world.side_effects_reaped(), 3);
            assert_eq!(world.record().bells, 3);

            let outcome = world.outcome().ok_or("no outcome")?;
            assert_eq!(outcome.failed_attempts, 3);
            assert_eq!(outcome.reaped, 3);
            Ok(())
        }))
        .run()
        .expect("scenario should succeed");
}

#[test]
fn rejected_attempt_stays_locked_with_empty_buffer() {
    Scenario::new("one-wrong")
        .type_text("nope")
        .enter()
        .oracle(Box::new(|world| {
            // Script ends while still locked.
            assert!(!world.unlocked());
            assert!(world.run_error().is_some());
            assert_eq!(world.side_effects_launched(), 1);
            assert_eq!(world.side_effects_reaped(), 1);
            assert_eq!(world.last_screen(0), Some(&Screen::Password { active: false }));
            assert!(world.all_released());
            Ok(())
        }))
        .run()
        .expect("scenario should succeed");
}

#[test]
fn side_effects_disabled_spawn_nothing() {
    let config = SessionConfig { side_effect_enabled: false, ..SessionConfig::default() };

    Scenario::new("no-side-effect")
        .config(config)
        .type_text("x")
        .enter()
        .type_text("secret")
        .enter()
        .oracle(Box::new(|world| {
            assert!(world.unlocked());
            assert_eq!(world.side_effects_launched(), 0);
            assert_eq!(world.record().bells, 1);
            Ok(())
        }))
        .run()
        .expect("scenario should succeed");
}

#[test]
fn helper_launch_failure_does_not_affect_lock() {
    Scenario::new("helper-missing")
        .helper_fails()
        .type_text("x")
        .enter()
        .type_text("secret")
        .enter()
        .oracle(Box::new(|world| {
            assert!(world.unlocked());
            assert_eq!(world.side_effects_launched(), 0);
            assert_eq!(world.outcome().map(|o| o.failed_attempts), Some(1));
            Ok(())
        }))
        .run()
        .expect("scenario should succeed");
}

#[test]
fn toggle_round_trip_restores_password_draft() {
    Scenario::new("toggle-restores")
        .password("secret")
        .type_text("sec")
        .ctrl_space()
        .type_text("hi")
        .ctrl_space()
        .type_text("ret")
        .enter()
        .oracle(Box::new(|world| {
            // "sec" survived the trip through message mode.
            assert!(world.unlocked());
            assert_eq!(world.verifications(), 1);
            // Leaving with ctrl+space discards the message draft.
            assert!(world.messages().is_empty());
            assert!(world.draws_on(0).contains(&&Screen::Password { active: true }));
            Ok(())
        }))
        .run()
        .expect("scenario should succeed");
}

#[test]
fn message_mode_disabled_ignores_toggle() {
    let config = SessionConfig { message_enabled: false, ..SessionConfig::default() };

    Scenario::new("no-message-mode")
        .config(config)
        .ctrl_space()
        .type_text("secret")
        .enter()
        .oracle(Box::new(|world| {
            assert!(world.unlocked());
            assert!(
                world.draws_on(0).iter().all(|s| matches!(s, Screen::Password { .. })),
                "message screen drawn while disabled"
            );
            Ok(())
        }))
        .run()
        .expect("scenario should succeed");
}

#[test]
fn escape_clears_and_redraws_idle() {
    Scenario::new("escape")
        .type_text("wrong")
        .escape()
        .type_text("secret")
        .enter()
        .oracle(Box::new(|world| {
            assert!(world.unlocked());
            assert_eq!(world.verifications(), 1);
            assert_eq!(
                world.draws_on(0),
                vec![
                    &Screen::Password { active: false },
                    &Screen::Password { active: true },
                    &Screen::Password { active: false },
                    &Screen::Password { active: true },
                ]
            );
            Ok(())
        }))
        .run()
        .expect("scenario should succeed");
}

#[test]
fn keypad_keys_normalize() {
    Scenario::new("keypad")
        .password("12*")
        .key(KeyPress::plain(keysym::KP_0 + 1))
        .key(KeyPress::plain(keysym::KP_0 + 2))
        .key(KeyPress::plain(keysym::KP_MULTIPLY))
        .key(KeyPress::plain(keysym::SHIFT_L))
        .key(KeyPress::plain(keysym::F1))
        .key(KeyPress::plain(keysym::KP_ENTER))
        .oracle(Box::new(|world| {
            assert!(world.unlocked());
            Ok(())
        }))
        .run()
        .expect("scenario should succeed");
}

#[test]
fn notifications_raise_every_captured_surface() {
    Scenario::new("notify")
        .surfaces(3)
        .notify()
        .notify()
        .type_text("secret")
        .enter()
        .oracle(Box::new(|world| {
            assert!(world.unlocked());
            let raises = &world.record().raises;
            for surface in 0..3 {
                assert_eq!(raises.iter().filter(|&&s| s == surface).count(), 2);
            }
            Ok(())
        }))
        .run()
        .expect("scenario should succeed");
}

#[test]
fn sink_failure_is_silent() {
    Scenario::new("sink-fails")
        .sink_fails()
        .ctrl_space()
        .type_text("lost")
        .enter()
        .type_text("secret")
        .enter()
        .oracle(Box::new(|world| {
            assert!(world.unlocked());
            assert!(world.messages().is_empty());
            Ok(())
        }))
        .run()
        .expect("scenario should succeed");
}

#[test]
fn empty_message_is_not_saved() {
    Scenario::new("empty-message")
        .ctrl_space()
        .enter()
        .type_text("secret")
        .enter()
        .oracle(Box::new(|world| {
            assert!(world.unlocked());
            assert!(world.messages().is_empty());
            Ok(())
        }))
        .run()
        .expect("scenario should succeed");
}

#[test]
fn display_failure_releases_before_error() {
    Scenario::new("display-dies")
        .surfaces(2)
        .type_text("sec")
        .display_failure("connection reset")
        .oracle(Box::new(|world| {
            let error = world.run_error().ok_or("expected a runtime error")?;
            assert!(error.contains("connection reset"), "{error}");
            assert!(world.outcome().is_none());
            for surface in 0..2 {
                assert!(world.record().released_once(surface));
            }
            assert!(world.all_released());
            Ok(())
        }))
        .run()
        .expect("scenario should succeed");
}

#[test]
fn display_failure_reaps_pending_jobs_once() {
    Scenario::new("fail-after-reject")
        .type_text("nope")
        .enter()
        .type_text("no")
        .enter()
        .display_failure("server gone")
        .oracle(Box::new(|world| {
            assert!(world.run_error().is_some());
            assert_eq!(world.side_effects_launched(), 2);
            // Each job waited on exactly once across the failure path and drop.
            assert_eq!(world.side_effects_reaped(), 2);
            assert!(world.all_released());
            Ok(())
        }))
        .run()
        .expect("scenario should succeed");
}

#[test]
fn outcome_reports_unlocking_state() {
    Scenario::new("state")
        .type_text("secret")
        .enter()
        .oracle(Box::new(|world| {
            assert_eq!(world.outcome().map(|o| o.state), Some(LockState::Unlocking));
            // Nothing is read after the unlock.
            assert_eq!(world.record().events_read, 7);
            Ok(())
        }))
        .run()
        .expect("scenario should succeed");
}
