//! Prints "alright alright alright " and then counts down a transient event.
//!
//! ```bash
//! cargo run -p strata --example greeting
//! ```

use std::io::Write;

use strata::ecs::{Commands, Component, Entity, Options, Runtime, Violation, With};

#[derive(Component, Clone)]
struct Greeting {
    msg: &'static str,
}

#[derive(Component, Clone, Copy, Debug, Default, PartialEq)]
#[component(global)]
struct Frame(u32);

#[derive(Component, Clone)]
#[component(tag, transient)]
struct Wave;

fn greet(greeting: &Greeting) {
    print!("{}", greeting.msg);
}

fn wave_back(entity: Entity, _wave: With<Wave>, _greeting: &Greeting, frame: &Frame) {
    println!("\nentity {entity} waved in frame {}", frame.0);
}

fn main() -> Result<(), Violation> {
    let mut runtime = Runtime::new();

    runtime.add_component(0..=2, Greeting { msg: "alright " });
    let greet = runtime.make_system_with(Options::new().manual_update(), greet)?;
    runtime.make_system(wave_back)?;
    runtime.make_system(|frame: &mut Frame, mut commands: Commands<'_>| {
        frame.0 += 1;
        if frame.0 == 2 {
            commands.add_component(1, Wave);
        }
    })?;

    runtime.update_system(greet);
    println!();
    let _ = std::io::stdout().flush();

    for _ in 0..4 {
        runtime.update();
    }
    Ok(())
}
