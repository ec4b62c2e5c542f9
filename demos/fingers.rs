use libfingertrack::input::ev::EvDevContext;
use libfingertrack::input::multitouch::{MultitouchEvent, TrackerOptions, UnresolvedSlot};
use libfingertrack::input::InputEvent;
use std::sync::mpsc::channel;

fn main() {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let path = match args.next() {
        Some(path) => path,
        None => {
            eprintln!("usage: fingers /dev/input/eventN [--keep-unresolved-slot]");
            std::process::exit(2);
        }
    };
    let options = TrackerOptions {
        unresolved_slot: match args.next().as_deref() {
            Some("--keep-unresolved-slot") => UnresolvedSlot::Keep,
            _ => UnresolvedSlot::Reset,
        },
    };

    let (input_tx, input_rx) = channel::<InputEvent>();
    let mut ctx = EvDevContext::new(&path, options, input_tx);
    if let Err(e) = ctx.start() {
        eprintln!("{}", e);
        std::process::exit(1);
    }

    eprintln!("Waiting for touches on {:?}...", ctx.path());
    for event in input_rx.iter() {
        match event {
            InputEvent::MultitouchEvent {
                event: MultitouchEvent::Report { mut fingers },
            } => {
                fingers.sort_by_key(|f| f.id);
                for f in fingers.iter() {
                    println!(
                        "Finger {} at ({}, {}) pressure {}",
                        f.id, f.x, f.y, f.pressure
                    );
                }
                println!("--- {} finger(s)", fingers.len());
            }
            InputEvent::MultitouchEvent {
                event: MultitouchEvent::Dropped,
            } => println!("--- events dropped by the kernel"),
            InputEvent::Closed {} => break,
        }
    }
    eprintln!("Device closed");
}
