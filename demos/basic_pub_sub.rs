//! Minimal publish/subscribe walkthrough.
//!
//! Run: cargo run --example basic_pub_sub

use anyhow::Result;
use topicbus::declare_topic;
use topicbus::handle::{ Publisher, Subscriber };

declare_topic!(SensorReading, "demo_sensor_reading", 8, struct SensorReadingData {
    instance: u16,
    millivolts: i32,
});

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let publisher = Publisher::<SensorReadingData>::new(0, 8);
    let mut subscriber = Subscriber::<SensorReadingData>::new(0);

    for millivolts in [1200, 1205, 1198] {
        publisher.publish(&SensorReadingData { instance: 0, millivolts })?;
        if let Some(reading) = subscriber.copy()? {
            println!("instance {} read {} mV", reading.instance, reading.millivolts);
        }
    }

    Ok(())
}
