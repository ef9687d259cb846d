use std::sync::Arc;

use area_warden::{
    Authorizer, BoundingBox, DomainDirectory, NullRegionSink, Point, Region, RegionRecord,
    WardenEvent, WardenRuntime, entry_permission,
};
use criterion::{Criterion, black_box, criterion_group, criterion_main};

struct AllowAll;

impl Authorizer for AllowAll {
    fn has_capability(&self, _user: &str, _permission: &str) -> bool {
        true
    }
}

struct AllLoaded;

impl DomainDirectory for AllLoaded {
    fn is_domain_loaded(&self, _domain: &str) -> bool {
        true
    }
}

const REGION_GRID: usize = 8;
const USERS: usize = 16;

fn movement_sweep(c: &mut Criterion) {
    let script = movement_script();
    c.bench_function("movement_sweep", |b| {
        b.iter(|| {
            let mut runtime = build_runtime();
            for event in black_box(script.clone()) {
                black_box(runtime.dispatch(event));
            }
        });
    });
}

fn create_edit_cycle(c: &mut Criterion) {
    c.bench_function("create_edit_cycle", |b| {
        b.iter(|| {
            let mut runtime = build_runtime();
            runtime.begin_create("op", "den", "", "world").unwrap();
            runtime
                .handle_capture("op", Point::new(100.0, 0.0, 100.0))
                .unwrap();
            runtime
                .handle_capture("op", Point::new(110.0, 10.0, 110.0))
                .unwrap();
            black_box(runtime.remove_region("den").unwrap());
        });
    });
}

fn build_runtime() -> WardenRuntime {
    let mut runtime = WardenRuntime::new(
        Arc::new(AllowAll),
        Arc::new(AllLoaded),
        Arc::new(NullRegionSink),
    );
    let records: Vec<RegionRecord> = (0..REGION_GRID * REGION_GRID)
        .map(|i| {
            let cell_x = (i % REGION_GRID) as f64 * 16.0;
            let cell_z = (i / REGION_GRID) as f64 * 16.0;
            let name = format!("cell-{i}");
            let region = Region::new(
                &name,
                BoundingBox::new(
                    Point::new(cell_x, 0.0, cell_z),
                    Point::new(cell_x + 15.0, 64.0, cell_z + 15.0),
                ),
                "world",
                entry_permission("warden", &name),
                "Entering {name}",
            );
            RegionRecord::from(&region)
        })
        .collect();
    runtime.load_regions(records);
    runtime
}

fn movement_script() -> Vec<WardenEvent> {
    let mut events = Vec::new();
    for step in 0..64 {
        for user in 0..USERS {
            events.push(WardenEvent::Move {
                user: format!("user-{user}"),
                domain: "world".to_string(),
                position: Point::new(step as f64 * 2.0, 8.0, (user * 9) as f64),
            });
        }
    }
    for user in 0..USERS {
        events.push(WardenEvent::Disconnect {
            user: format!("user-{user}"),
        });
    }
    events
}

criterion_group!(benches, movement_sweep, create_edit_cycle);
criterion_main!(benches);
