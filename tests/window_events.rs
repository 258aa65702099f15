mod common;

use common::{Call, TestWm};
use ringwm::config::{AppRule, Config};
use ringwm::wm::WmEvent;
use ringwm::wm::adapter::WindowChanges;
use ringwm::wm::keyboard::{Action, Modifiers};
use ringwm::wm::layout::Geometry;

#[test]
fn test_first_window_fills_the_work_area() {
    let mut t = TestWm::new();
    t.create(1);

    assert_eq!(t.geometry(1), Some(Geometry::new(0, 18, 1000, 782)));
    assert!(t.calls().contains(&Call::Map(1)));
    assert_eq!(t.last_status(), "0:1:0:1:0 1:0:0:0:0 2:0:0:0:0 3:0:0:0:0");
}

#[test]
fn test_second_window_splits_master_and_stack() {
    let mut t = TestWm::new();
    t.create(1);
    t.create(2);

    assert_eq!(t.geometry(1), Some(Geometry::new(0, 18, 516, 778)));
    assert_eq!(t.geometry(2), Some(Geometry::new(520, 18, 476, 778)));
}

#[test]
fn test_known_window_is_not_managed_twice() {
    let mut t = TestWm::new();
    t.create(1);
    t.create(1);
    assert_eq!(t.windows(), vec![1]);
}

#[test]
fn test_destroyed_window_is_removed() {
    let mut t = TestWm::new();
    for w in 1..=3 {
        t.create(w);
    }
    t.clear_calls();

    t.event(WmEvent::WindowDestroyed { window: 3 });

    assert_eq!(t.windows(), vec![1, 2]);
    assert_eq!(t.current(), Some(2));
    assert_eq!(t.focused(), Some(2));
    assert!(t.geometry(1).is_some());
    assert_eq!(t.last_status(), "0:2:0:1:0 1:0:0:0:0 2:0:0:0:0 3:0:0:0:0");
}

#[test]
fn test_removing_master_focuses_new_master() {
    let mut t = TestWm::new();
    for w in 1..=3 {
        t.create(w);
    }

    t.event(WmEvent::WindowUnmapped { window: 1 });

    assert_eq!(t.windows(), vec![2, 3]);
    assert_eq!(t.current(), Some(2));
}

#[test]
fn test_removal_on_hidden_desktop_only_updates_status() {
    let mut t = TestWm::new();
    t.create(1);
    t.action(Action::ChangeDesktop(1));
    t.create(2);
    t.clear_calls();

    t.event(WmEvent::WindowDestroyed { window: 1 });

    assert!(t.calls().is_empty());
    assert!(t.wm.desktops().get(0).unwrap().is_empty());
    assert_eq!(t.windows(), vec![2]);
    assert_eq!(t.last_status(), "0:0:0:0:0 1:1:0:1:0 2:0:0:0:0 3:0:0:0:0");
}

#[test]
fn test_unknown_window_removal_is_harmless() {
    let mut t = TestWm::new();
    t.create(1);
    t.clear_calls();

    t.event(WmEvent::WindowDestroyed { window: 42 });

    assert!(t.calls().is_empty());
    assert_eq!(t.windows(), vec![1]);
}

#[test]
fn test_monocle_maps_new_current_after_removal() {
    let mut t = TestWm::new();
    t.create(1);
    t.create(2);
    t.action(Action::SwitchMode(ringwm::wm::layout::Mode::Monocle));
    t.clear_calls();

    t.event(WmEvent::WindowDestroyed { window: 2 });

    assert_eq!(t.current(), Some(1));
    assert_eq!(t.mapped(1), 1);
}

#[test]
fn test_new_window_in_monocle_hides_previous() {
    let mut t = TestWm::new();
    t.create(1);
    t.action(Action::SwitchMode(ringwm::wm::layout::Mode::Monocle));
    t.clear_calls();

    t.create(2);

    assert_eq!(t.unmapped(1), 1);
    assert_eq!(t.mapped(2), 1);
    assert_eq!(t.current(), Some(2));
}

#[test]
fn test_rule_with_follow_switches_desktop() {
    let mut t = TestWm::new();
    t.create_with_class(7, Some("MPlayer"));

    assert_eq!(t.wm.desktops().active_index(), 3);
    assert_eq!(t.windows(), vec![7]);
    assert_eq!(t.current(), Some(7));
    assert!(t.calls().contains(&Call::Map(7)));
    assert_eq!(t.last_status(), "0:0:0:0:0 1:0:0:0:0 2:0:0:0:0 3:1:0:1:0");
}

#[test]
fn test_rule_without_follow_stays_hidden() {
    let mut t = TestWm::new();
    t.action(Action::ChangeDesktop(1));
    t.clear_calls();

    t.create_with_class(8, Some("Gimp"));

    assert_eq!(t.wm.desktops().active_index(), 1);
    assert!(!t.calls().contains(&Call::Map(8)));
    assert_eq!(t.wm.desktops().get(0).unwrap().ring.windows(), vec![8]);
    assert_eq!(t.last_status(), "0:1:0:0:0 1:0:0:1:0 2:0:0:0:0 3:0:0:0:0");
}

#[test]
fn test_rule_matches_instance_name() {
    let mut config = Config::default();
    config.rules = vec![AppRule {
        class: "scratch".to_string(),
        desktop: Some(2),
        follow: false,
        float: false,
    }];
    let mut t = TestWm::with_config(config);

    t.event(WmEvent::WindowCreated {
        window: 4,
        class: Some("URxvt".to_string()),
        instance: Some("scratch".to_string()),
        transient: false,
    });

    assert_eq!(t.wm.desktops().get(2).unwrap().ring.windows(), vec![4]);
}

#[test]
fn test_transient_skips_rules_and_tiling() {
    let mut t = TestWm::new();
    t.create(1);
    t.clear_calls();

    t.event(WmEvent::WindowCreated {
        window: 2,
        class: Some("MPlayer".to_string()),
        instance: None,
        transient: true,
    });

    assert_eq!(t.wm.desktops().active_index(), 0);
    assert_eq!(t.windows(), vec![1, 2]);
    assert!(t.calls().contains(&Call::Map(2)));
    assert!(t.geometry(2).is_none());
}

#[test]
fn test_configure_request_is_clamped() {
    let mut t = TestWm::new();
    t.create(1);
    t.clear_calls();

    t.event(WmEvent::ConfigureRequest {
        window: 5,
        changes: WindowChanges {
            x: Some(10),
            y: Some(0),
            width: Some(2000),
            height: Some(100),
        },
    });

    assert_eq!(
        t.calls()[0],
        Call::Configure(
            5,
            WindowChanges {
                x: Some(10),
                y: Some(18),
                width: Some(1000),
                height: Some(100),
            }
        )
    );
    // tiling is reapplied afterwards
    assert!(t.geometry(1).is_some());
}

#[test]
fn test_configure_request_keeps_unrequested_fields() {
    let mut t = TestWm::new();
    t.action(Action::TogglePanel);
    t.clear_calls();

    t.event(WmEvent::ConfigureRequest {
        window: 5,
        changes: WindowChanges {
            y: Some(0),
            height: Some(900),
            ..Default::default()
        },
    });

    assert_eq!(
        t.calls(),
        &[Call::Configure(
            5,
            WindowChanges {
                x: None,
                y: Some(0),
                width: None,
                height: Some(800),
            }
        )]
    );
}

#[test]
fn test_key_press_runs_bound_action() {
    let mut t = TestWm::new();
    t.create(1);
    t.create(2);

    t.event(WmEvent::KeyPress {
        keysym: 0x6a,
        modifiers: Modifiers::MOD4,
    });
    assert_eq!(t.current(), Some(1));

    t.event(WmEvent::KeyPress {
        keysym: 0x6a,
        modifiers: Modifiers::MOD4 | Modifiers::SHIFT | Modifiers::CONTROL,
    });
    assert_eq!(t.current(), Some(1));

    t.event(WmEvent::KeyPress {
        keysym: 0xffbe,
        modifiers: Modifiers::MOD4,
    });
    assert_eq!(t.wm.desktops().active_index(), 0);

    t.event(WmEvent::KeyPress {
        keysym: 0xffbf,
        modifiers: Modifiers::MOD4,
    });
    assert_eq!(t.wm.desktops().active_index(), 1);
}

#[test]
fn test_window_sent_to_hidden_desktop_is_unmapped() {
    let mut config = Config::default();
    config.rules = vec![AppRule {
        class: "Term".to_string(),
        desktop: Some(2),
        follow: false,
        float: false,
    }];
    let mut t = TestWm::with_config(config);

    // already visible, as when adopted at startup
    t.event(WmEvent::WindowCreated {
        window: 42,
        class: Some("Term".to_string()),
        instance: None,
        transient: false,
    });

    assert_eq!(t.wm.desktops().active_index(), 0);
    assert_eq!(t.wm.desktops().get(2).unwrap().ring.windows(), vec![42]);
    assert_eq!(t.unmapped(42), 1);
    assert_eq!(t.mapped(42), 0);
}

#[test]
fn test_configure_request_keeps_x_on_screen() {
    let mut t = TestWm::new();

    t.event(WmEvent::ConfigureRequest {
        window: 5,
        changes: WindowChanges {
            x: Some(-40),
            ..Default::default()
        },
    });
    t.event(WmEvent::ConfigureRequest {
        window: 6,
        changes: WindowChanges {
            x: Some(5000),
            ..Default::default()
        },
    });

    let configured: Vec<_> = t
        .calls()
        .iter()
        .filter_map(|c| match c {
            Call::Configure(w, changes) => Some((*w, changes.x)),
            _ => None,
        })
        .collect();
    assert_eq!(configured, vec![(5, Some(0)), (6, Some(998))]);
}
