use std::time::Duration;

use dustfield_core::{
    CellState, Command, Event, GridCoord, HeadlessHost, Imprint, OverlapTag, TerrainConfig, Tint,
    VisualHandle,
};
use dustfield_world::{self as world, query, World};

struct Harness {
    world: World,
    host: HeadlessHost,
}

impl Harness {
    fn new(config: TerrainConfig) -> Self {
        let mut host = HeadlessHost::new(8, 8);
        host.set_loop_duration(Duration::from_secs(1));
        Self {
            world: World::new(config),
            host,
        }
    }

    fn apply(&mut self, command: Command) -> Vec<Event> {
        let mut events = Vec::new();
        world::apply(&mut self.world, &self.host, command, &mut events);
        assert!(
            query::is_index_consistent(&self.world),
            "solid index diverged from cell records"
        );
        events
    }

    fn tick(&mut self, millis: u64) -> Vec<Event> {
        self.apply(Command::Tick {
            dt: Duration::from_millis(millis),
        })
    }

    fn step(&mut self) -> Vec<Event> {
        let _ = self.host.advance_step();
        self.tick(0)
    }

    fn adopt(&mut self, cell: GridCoord, visual: u32) {
        let _ = self.apply(Command::AdoptVisual {
            cell,
            visual: VisualHandle::new(visual),
        });
    }
}

fn regrowing(events: &[Event]) -> Vec<GridCoord> {
    events
        .iter()
        .filter_map(|event| match event {
            Event::CellRegrowing { cell, .. } => Some(*cell),
            _ => None,
        })
        .collect()
}

#[test]
fn carved_cell_regrows_back_to_solid() {
    let mut harness = Harness::new(TerrainConfig::default());
    let cell = GridCoord::new(3, 3);
    harness.adopt(cell, 7);

    let events = harness.apply(Command::Carve {
        center: cell,
        radius: 0,
        fade: Duration::from_millis(100),
        imprint: None,
    });
    assert!(events.contains(&Event::CellClearing {
        cell,
        visual: Some(VisualHandle::new(7)),
        fade: Duration::from_millis(100),
    }));
    assert_eq!(query::cell_state(&harness.world, cell), Some(CellState::Clearing));
    assert!(!query::is_solid(&harness.world, cell));
    assert!(query::has_regrow_timer(&harness.world, cell));

    let events = harness.apply(Command::FadeFinished { cell });
    assert_eq!(events, vec![Event::CellEmptied { cell }]);

    let events = harness.tick(1_000);
    assert!(events.contains(&Event::RegrowEligible { cell }));
    assert_eq!(
        query::cell_state(&harness.world, cell),
        Some(CellState::PendingRegrow)
    );

    let events = harness.step();
    assert!(events.contains(&Event::CellRegrowing {
        cell,
        visual: VisualHandle::new(7),
        grow_in: Duration::from_millis(400),
        imprint: None,
    }));

    let events = harness.tick(300);
    assert!(events.contains(&Event::CellSolidified {
        cell,
        visual: VisualHandle::new(7),
    }));
    assert!(query::is_solid(&harness.world, cell));
    assert_eq!(query::regrowth_view(&harness.world), query::RegrowthView::default());
}

#[test]
fn unfinished_fade_backs_off() {
    let mut harness = Harness::new(TerrainConfig::default());
    let cell = GridCoord::new(2, 5);
    harness.adopt(cell, 0);
    let _ = harness.apply(Command::Carve {
        center: cell,
        radius: 0,
        fade: Duration::from_secs(5),
        imprint: None,
    });

    let events = harness.tick(1_000);
    assert!(!events.contains(&Event::RegrowEligible { cell }));
    assert_eq!(query::cell_state(&harness.world, cell), Some(CellState::Clearing));
    assert!(query::has_regrow_timer(&harness.world, cell));

    let _ = harness.apply(Command::FadeFinished { cell });
    let events = harness.tick(250);
    assert!(events.contains(&Event::RegrowEligible { cell }));
}

#[test]
fn request_outside_the_grid_is_dropped() {
    let mut harness = Harness::new(TerrainConfig::default());
    let _ = harness.tick(0);

    let events = harness.apply(Command::RequestRegrow {
        cell: GridCoord::new(-1, 4),
        delay: None,
        refresh: false,
    });

    assert!(events.is_empty());
    assert_eq!(query::regrowth_view(&harness.world).timers, 0);
}

#[test]
fn promotions_follow_the_step_budget() {
    let config = TerrainConfig {
        regrow_cells_per_step: 2,
        ..TerrainConfig::default()
    };
    let mut harness = Harness::new(config);
    let cells: Vec<GridCoord> = (0..5).map(|column| GridCoord::new(column, 0)).collect();
    for &cell in &cells {
        let _ = harness.apply(Command::RequestRegrow {
            cell,
            delay: Some(Duration::ZERO),
            refresh: false,
        });
    }

    let events = harness.tick(0);
    let eligible = events
        .iter()
        .filter(|event| matches!(event, Event::RegrowEligible { .. }))
        .count();
    assert_eq!(eligible, 5);
    assert!(regrowing(&events).is_empty(), "first observed step only records");
    assert_eq!(query::regrowth_view(&harness.world).queued, 5);

    assert!(regrowing(&harness.tick(0)).is_empty(), "same step promotes nothing");

    assert_eq!(regrowing(&harness.step()), cells[0..2].to_vec());
    assert_eq!(regrowing(&harness.step()), cells[2..4].to_vec());
    assert_eq!(regrowing(&harness.step()), cells[4..5].to_vec());
    assert_eq!(query::regrowth_view(&harness.world).queued, 0);
    assert_eq!(query::count_cells(&harness.world, CellState::Regrowing), 5);
}

#[test]
fn vehicle_overlap_delays_eligibility() {
    let mut harness = Harness::new(TerrainConfig::default());
    let cell = GridCoord::new(4, 4);
    harness.host.place_body(1, cell, OverlapTag::Vehicle);

    let _ = harness.apply(Command::RequestRegrow {
        cell,
        delay: Some(Duration::ZERO),
        refresh: false,
    });
    let events = harness.tick(0);
    assert!(!events.contains(&Event::RegrowEligible { cell }));
    assert!(query::has_regrow_timer(&harness.world, cell));
    assert!(!query::is_regrow_blocked(&harness.world, cell));

    harness.host.remove_body(1);
    let events = harness.tick(250);
    assert!(events.contains(&Event::RegrowEligible { cell }));
}

#[test]
fn dust_overlaps_do_not_veto() {
    let mut harness = Harness::new(TerrainConfig::default());
    let cell = GridCoord::new(1, 1);
    harness.host.place_body(9, cell, OverlapTag::Dust);

    let _ = harness.apply(Command::RequestRegrow {
        cell,
        delay: Some(Duration::ZERO),
        refresh: false,
    });
    assert!(harness.tick(0).contains(&Event::RegrowEligible { cell }));
}

#[test]
fn blocked_settle_sends_cell_back_to_pending() {
    let mut harness = Harness::new(TerrainConfig::default());
    let cell = GridCoord::new(5, 2);
    let _ = harness.apply(Command::RequestRegrow {
        cell,
        delay: Some(Duration::ZERO),
        refresh: false,
    });
    let _ = harness.tick(0);
    assert_eq!(regrowing(&harness.step()), vec![cell]);

    harness.host.place_body(3, cell, OverlapTag::Collectable);
    let events = harness.tick(300);
    assert!(events
        .iter()
        .any(|event| matches!(event, Event::RegrowDeferred { cell: deferred, .. } if *deferred == cell)));
    assert_eq!(
        query::cell_state(&harness.world, cell),
        Some(CellState::PendingRegrow)
    );

    assert!(regrowing(&harness.step()).is_empty(), "collectable still present");

    harness.host.remove_body(3);
    assert_eq!(regrowing(&harness.step()), vec![cell]);
    let events = harness.tick(300);
    assert!(events
        .iter()
        .any(|event| matches!(event, Event::CellSolidified { cell: solid, .. } if *solid == cell)));
}

#[test]
fn held_cells_wait_for_the_hold_to_lapse() {
    let mut harness = Harness::new(TerrainConfig::default());
    let cell = GridCoord::new(6, 6);
    let _ = harness.apply(Command::HoldCell {
        cell,
        duration: Duration::from_millis(500),
    });
    let _ = harness.apply(Command::RequestRegrow {
        cell,
        delay: Some(Duration::ZERO),
        refresh: false,
    });

    assert!(!harness.tick(0).contains(&Event::RegrowEligible { cell }));
    assert!(query::is_effectively_open(&harness.world, cell));
    assert!(!harness.tick(250).contains(&Event::RegrowEligible { cell }));
    assert!(harness.tick(250).contains(&Event::RegrowEligible { cell }));
    assert!(!query::is_held(&harness.world, cell));
}

#[test]
fn imprint_travels_with_the_regrowth() {
    let mut harness = Harness::new(TerrainConfig::default());
    let cell = GridCoord::new(3, 4);
    harness.adopt(cell, 2);
    let imprint = Imprint::new(Tint::new(1.0, 0.0, 0.0), Tint::new(0.2, 0.0, 0.0), 1.0)
        .with_regrow_delay(Duration::from_millis(100));

    let _ = harness.apply(Command::Carve {
        center: cell,
        radius: 0,
        fade: Duration::ZERO,
        imprint: Some(imprint),
    });
    let _ = harness.apply(Command::FadeFinished { cell });
    assert_eq!(query::imprint(&harness.world, cell), Some(imprint));

    assert!(harness.tick(100).contains(&Event::RegrowEligible { cell }));
    let events = harness.step();
    assert!(events.contains(&Event::CellRegrowing {
        cell,
        visual: VisualHandle::new(2),
        grow_in: Duration::from_millis(400),
        imprint: Some(imprint),
    }));

    let _ = harness.tick(300);
    assert!(query::is_solid(&harness.world, cell));
    assert_eq!(query::imprint(&harness.world, cell), None);

    let default_tint = query::config(&harness.world).default_tint;
    let tint = query::tint(&harness.world, cell).expect("solid cell has a tint");
    assert!(tint.red > default_tint.red, "{tint:?}");
    assert!(tint.green < default_tint.green, "{tint:?}");
}

#[test]
fn carve_budget_limits_cleared_cells() {
    let config = TerrainConfig {
        carve_budget: 3,
        ..TerrainConfig::default()
    };
    let mut harness = Harness::new(config);
    let center = GridCoord::new(4, 4);
    for (visual, cell) in center.neighbors().into_iter().chain([center]).enumerate() {
        harness.adopt(cell, visual as u32);
    }

    let events = harness.apply(Command::Carve {
        center,
        radius: 1,
        fade: Duration::from_millis(50),
        imprint: None,
    });

    let clearing = events
        .iter()
        .filter(|event| matches!(event, Event::CellClearing { .. }))
        .count();
    assert_eq!(clearing, 3);
    assert_eq!(
        query::cell_state(&harness.world, center),
        Some(CellState::Clearing),
        "nearest cells clear first"
    );
    assert_eq!(query::solid_cells(&harness.world).len(), 4);
    assert_eq!(query::regrowth_view(&harness.world).timers, 7);
}

#[test]
fn carving_a_regrowing_cell_restarts_it() {
    let mut harness = Harness::new(TerrainConfig::default());
    let cell = GridCoord::new(2, 2);
    let _ = harness.apply(Command::RequestRegrow {
        cell,
        delay: Some(Duration::ZERO),
        refresh: false,
    });
    let _ = harness.tick(0);
    let _ = harness.step();
    assert_eq!(query::regrowth_view(&harness.world).settling, 1);

    let events = harness.apply(Command::Carve {
        center: cell,
        radius: 0,
        fade: Duration::from_millis(80),
        imprint: None,
    });
    assert!(events
        .iter()
        .any(|event| matches!(event, Event::CellClearing { cell: cleared, .. } if *cleared == cell)));
    assert_eq!(query::regrowth_view(&harness.world).settling, 0);

    let events = harness.tick(300);
    assert!(!events
        .iter()
        .any(|event| matches!(event, Event::CellSolidified { .. })));
}

#[test]
fn carved_region_grows_back_completely() {
    let mut harness = Harness::new(TerrainConfig::default());
    let center = GridCoord::new(4, 3);
    let region: Vec<GridCoord> = [center].into_iter().chain(center.neighbors()).collect();
    for (visual, &cell) in region.iter().enumerate() {
        harness.adopt(cell, visual as u32);
    }

    let _ = harness.apply(Command::Carve {
        center,
        radius: 1,
        fade: Duration::from_millis(50),
        imprint: None,
    });
    for &cell in &region {
        let _ = harness.apply(Command::FadeFinished { cell });
    }
    assert!(query::solid_cells(&harness.world).is_empty());

    let _ = harness.tick(1_000);
    assert_eq!(regrowing(&harness.step()).len(), 6);
    assert_eq!(regrowing(&harness.step()).len(), 1);
    let _ = harness.tick(300);

    let mut expected = region.clone();
    expected.sort();
    assert_eq!(query::solid_cells(&harness.world), expected);
    let _ = harness.apply(Command::PhysicsTick);
    assert!(!query::is_composite_dirty(&harness.world));
}

#[test]
fn oversized_carve_is_bounded_by_the_grid() {
    let mut harness = Harness::new(TerrainConfig::default());
    harness.adopt(GridCoord::new(0, 0), 1);
    harness.adopt(GridCoord::new(7, 7), 2);

    let events = harness.apply(Command::Carve {
        center: GridCoord::new(3, 3),
        radius: u32::MAX,
        fade: Duration::from_millis(100),
        imprint: None,
    });

    let cleared = events
        .iter()
        .filter(|event| matches!(event, Event::CellClearing { .. }))
        .count();
    assert_eq!(cleared, 2);
    assert_eq!(query::regrowth_view(&harness.world).timers, 64);
}

#[test]
fn unusable_settings_are_clamped() {
    let config = TerrainConfig {
        regrow_cells_per_step: 0,
        regrow_delay_loops: f32::INFINITY,
        ..TerrainConfig::default()
    };
    let mut harness = Harness::new(config);
    assert_eq!(query::config(&harness.world).regrow_cells_per_step, 1);

    let cell = GridCoord::new(2, 2);
    let _ = harness.apply(Command::RequestRegrow {
        cell,
        delay: None,
        refresh: false,
    });
    assert!(harness.tick(1_000).contains(&Event::RegrowEligible { cell }));
    assert_eq!(regrowing(&harness.step()), vec![cell]);
}
