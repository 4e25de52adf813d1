//! # Control Tick Benchmark

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use arot_lib::{
    arot_ctrl::{ArotCtrl, Params},
    arot_mode::ArotMode,
    sim::{SimParams, SimVehicle},
    vehicle::LandDetector,
};

/// Control cycle period, 400 Hz.
const DT: f64 = 0.0025;

fn enabled_params() -> Params {
    Params {
        enable: true,
        ..Params::default()
    }
}

/// A mode activated at the simulation's power loss.
fn new_mode() -> ArotMode<SimVehicle> {
    let mut mode = ArotMode::with_params(enabled_params(), SimVehicle::new(SimParams::default()));
    mode.activate().unwrap();
    mode
}

fn tick_benchmark(c: &mut Criterion) {
    // Full cycle of the mode and simulation, restarting the descent whenever it lands
    c.bench_function("ArotMode::run", |b| {
        let mut mode = new_mode();

        b.iter(|| {
            if !mode.is_active() || mode.vehicle().land_complete() {
                mode = new_mode();
            }

            let out = mode.run(DT).unwrap();
            mode.vehicle_mut().step(DT);
            black_box(out)
        })
    });

    // Flare feasibility evaluation on its own, the most expensive part of a glide cycle
    c.bench_function("ArotCtrl::should_flare", |b| {
        let mut vehicle = SimVehicle::new(SimParams {
            initial_alt_m: 30.0,
            initial_vel_z_ms: -5.0,
            ..SimParams::default()
        });
        let mut ctrl = ArotCtrl::new(enabled_params());
        ctrl.init(&vehicle);
        ctrl.set_dt(DT);

        b.iter(|| black_box(ctrl.should_flare(&mut vehicle)))
    });
}

criterion_group!(benches, tick_benchmark);
criterion_main!(benches);
