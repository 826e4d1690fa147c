// SynPad - ARM/Thumb Emulation Core
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use synpad_core::cpu::Arm7;
use synpad_core::memory::ProgramImage;
use synpad_core::{AddressSpace, Cpu, Machine};

const RAM: u32 = 0x0200_0000;
const STEPS: u64 = 10_000;

fn machine_for(program: &[u8], entry: u32) -> Machine<Arm7> {
    let mut machine = Machine::new(Arm7::new(), AddressSpace::default());
    let mut image = ProgramImage::new(entry);
    image.add_segment(RAM, program.to_vec());
    // The image is static and always fits RAM.
    let _ = machine.load_program(&image);
    machine
}

fn bench_arm_loop(c: &mut Criterion) {
    // ADD R0, R0, #1; SUBS R1, R1, #1; STR R0, [R2]; B -> start
    let program: Vec<u8> = [0xE280_0001u32, 0xE251_1001, 0xE582_0000, 0xEAFF_FFFC]
        .iter()
        .flat_map(|w| w.to_le_bytes())
        .collect();
    let mut machine = machine_for(&program, RAM);
    machine.cpu.set_register(2, RAM + 0x1000);

    let mut group = c.benchmark_group("step");
    group.throughput(Throughput::Elements(STEPS));
    group.bench_function("arm_loop", |b| {
        b.iter(|| {
            for _ in 0..STEPS {
                black_box(machine.step());
            }
        })
    });
    group.finish();
}

fn bench_thumb_loop(c: &mut Criterion) {
    // ADD R0, #1; EOR R1, R0; LSL R2, R1, #3; B -> start
    let program: Vec<u8> = [0x3001u16, 0x4041, 0x00CA, 0xE7FC]
        .iter()
        .flat_map(|h| h.to_le_bytes())
        .collect();
    let mut machine = machine_for(&program, RAM | 1);

    let mut group = c.benchmark_group("step");
    group.throughput(Throughput::Elements(STEPS));
    group.bench_function("thumb_loop", |b| {
        b.iter(|| {
            for _ in 0..STEPS {
                black_box(machine.step());
            }
        })
    });
    group.finish();
}

criterion_group!(benches, bench_arm_loop, bench_thumb_loop);
criterion_main!(benches);
