//! Poll-aggregator wakeup across two topics.
//!
//! Run: cargo run --example poll_wakeup

use std::thread;
use std::time::Duration;

use anyhow::Result;
use topicbus::declare_topic;
use topicbus::handle::{ Publisher, Subscriber };
use topicbus::poll::PollSet;

declare_topic!(Accel, "demo_accel", 4, struct AccelData { x: i32 });
declare_topic!(Gyro, "demo_gyro", 4, struct GyroData { yaw: i32 });

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let accel_pub = Publisher::<AccelData>::new(0, 4);
    let gyro_pub = Publisher::<GyroData>::new(0, 4);

    let accel_sub = Subscriber::<AccelData>::new(0);
    let gyro_sub = Subscriber::<GyroData>::new(0);

    let mut poll = PollSet::new();
    let (accel_node, accel_cursor) = accel_sub.node_and_cursor();
    let (gyro_node, gyro_cursor) = gyro_sub.node_and_cursor();
    poll.add(accel_node, accel_cursor);
    poll.add(gyro_node, gyro_cursor);

    let producer = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        gyro_pub.publish(&GyroData { yaw: 17 }).unwrap();
        thread::sleep(Duration::from_millis(50));
        accel_pub.publish(&AccelData { x: 9 }).unwrap();
    });

    let mut woken = 0;
    while woken < 2 {
        if poll.wait(Duration::from_secs(1)) == 0 {
            continue;
        }
        for index in poll.ready_indices() {
            let mut out = [0u8; 4];
            if poll.copy(index, &mut out)? {
                println!("member {index} ready: {:?}", i32::from_le_bytes(out));
                woken += 1;
            }
        }
    }

    producer.join().unwrap();
    Ok(())
}
