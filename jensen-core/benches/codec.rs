use criterion::{Criterion, black_box, criterion_group, criterion_main};
use jensen_core::{Command, Packet, ReceiveBuffer};

fn bench_decode(c: &mut Criterion) {
    let frame = Packet::with_body(Command::TransferFile, 1, vec![0x5A; 32 * 1024])
        .encode()
        .unwrap();

    c.bench_function("try_decode 32k frame", |b| {
        b.iter(|| Packet::try_decode(black_box(&frame)))
    });

    let mut stream = vec![0u8; 100];
    for seq in 0..16 {
        stream.extend_from_slice(
            &Packet::with_body(Command::TransferFile, seq, vec![0x33; 4096])
                .encode()
                .unwrap(),
        );
    }

    c.bench_function("reassemble 16 frames in 512-byte reads", |b| {
        b.iter(|| {
            let mut rx = ReceiveBuffer::new();
            let mut frames = 0;
            for chunk in stream.chunks(512) {
                rx.extend(chunk);
                while rx.next_packet().is_some() {
                    frames += 1;
                }
            }
            black_box(frames)
        })
    });
}

criterion_group!(benches, bench_decode);
criterion_main!(benches);
