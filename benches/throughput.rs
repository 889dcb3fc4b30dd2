use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use lockring::{MutexLock, NoLock, Queue, RingBuffer, Stack};
use std::sync::Arc;
use std::thread;

const MESSAGES: u64 = 1_000_000;
const FRAME: usize = 64;

fn bench_queue(c: &mut Criterion) {
    let mut group = c.benchmark_group("queue");
    group.throughput(Throughput::Elements(MESSAGES));

    group.bench_function("spsc", |b| {
        b.iter(|| {
            let queue = Arc::new(Queue::<u64>::new());

            let producer = {
                let queue = Arc::clone(&queue);
                thread::spawn(move || {
                    for i in 0..MESSAGES {
                        queue.enqueue(i).unwrap();
                    }
                })
            };

            let mut received = 0u64;
            while received < MESSAGES {
                match queue.dequeue() {
                    Some(v) => {
                        black_box(v);
                        received += 1;
                    }
                    None => std::hint::spin_loop(),
                }
            }
            producer.join().unwrap();
        });
    });

    group.bench_function("mpmc_4x4", |b| {
        b.iter(|| {
            let queue = Arc::new(Queue::<u64>::new());
            let per_producer = MESSAGES / 4;

            let producers: Vec<_> = (0..4)
                .map(|p| {
                    let queue = Arc::clone(&queue);
                    thread::spawn(move || {
                        let base = p * per_producer;
                        for i in 0..per_producer {
                            queue.enqueue(base + i).unwrap();
                        }
                    })
                })
                .collect();

            let consumers: Vec<_> = (0..4)
                .map(|_| {
                    let queue = Arc::clone(&queue);
                    thread::spawn(move || {
                        let mut received = 0u64;
                        while received < per_producer {
                            match queue.dequeue() {
                                Some(v) => {
                                    black_box(v);
                                    received += 1;
                                }
                                None => std::hint::spin_loop(),
                            }
                        }
                    })
                })
                .collect();

            for h in producers {
                h.join().unwrap();
            }
            for h in consumers {
                h.join().unwrap();
            }
        });
    });

    group.finish();
}

fn bench_stack(c: &mut Criterion) {
    let mut group = c.benchmark_group("stack");
    group.throughput(Throughput::Elements(MESSAGES));

    group.bench_function("push_pop_4_threads", |b| {
        b.iter(|| {
            let stack = Arc::new(Stack::<u64>::new());
            let per_thread = MESSAGES / 4;

            let workers: Vec<_> = (0..4u64)
                .map(|t| {
                    let stack = Arc::clone(&stack);
                    thread::spawn(move || {
                        for i in 0..per_thread {
                            stack.push(t << 32 | i).unwrap();
                            black_box(stack.pop());
                        }
                    })
                })
                .collect();

            for h in workers {
                h.join().unwrap();
            }
        });
    });

    group.finish();
}

fn bench_ring(c: &mut Criterion) {
    let mut group = c.benchmark_group("ring");
    group.throughput(Throughput::Bytes(MESSAGES / 64 * FRAME as u64));

    group.bench_function("nolock_frames", |b| {
        let ring = RingBuffer::<NoLock>::with_capacity(65536);
        let frame = [0x42u8; FRAME];
        let mut out = [0u8; FRAME];

        b.iter(|| {
            for _ in 0..MESSAGES / 64 {
                if ring.enqueue(&frame) == 0 {
                    ring.dequeue(&mut out);
                    ring.enqueue(&frame);
                }
                if ring.data_size() >= FRAME {
                    ring.dequeue(&mut out);
                }
                black_box(&out);
            }
        });
    });

    group.bench_function("mutex_frames_2_threads", |b| {
        b.iter(|| {
            let ring = Arc::new(RingBuffer::<MutexLock>::with_capacity(65536));
            let frames = MESSAGES / 64;

            let writer = {
                let ring = Arc::clone(&ring);
                thread::spawn(move || {
                    let frame = [0x42u8; FRAME];
                    let mut sent = 0u64;
                    while sent < frames {
                        if ring.enqueue(&frame) == FRAME {
                            sent += 1;
                        } else {
                            std::hint::spin_loop();
                        }
                    }
                })
            };

            let mut out = [0u8; FRAME];
            let mut received = 0u64;
            while received < frames {
                if ring.dequeue(&mut out) == FRAME {
                    black_box(&out);
                    received += 1;
                } else {
                    std::hint::spin_loop();
                }
            }
            writer.join().unwrap();
        });
    });

    group.finish();
}

criterion_group!(benches, bench_queue, bench_stack, bench_ring);
criterion_main!(benches);
