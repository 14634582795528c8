//! Stdin-driven stand-in for the hardware trigger button.

use anyhow::Result;
use snapspeak::PipelineHandle;
use std::io::{self, BufRead, Write};

/// Read trigger commands until EOF or quit.
///
/// An empty line is the shutter button; `h` toggles humor; `q` quits. A
/// trigger while the previous capture is still being announced is dropped,
/// exactly as a button press would be.
pub fn run_event_loop(handle: &PipelineHandle) -> Result<()> {
    println!("Press Enter to capture, 'h' to toggle humor, 'q' to quit.");
    let stdin = io::stdin();
    let mut humor = true;

    for line in stdin.lock().lines() {
        let line = line?;
        match line.trim() {
            "" => {
                if !handle.trigger() {
                    println!("Still working on the last capture, try again in a moment.");
                }
            }
            "h" => {
                humor = !humor;
                handle.set_humor(humor);
                println!("Humor {}.", if humor { "on" } else { "off" });
            }
            "q" => break,
            other => {
                println!("Unknown command {other:?}.");
            }
        }
        io::stdout().flush()?;
    }
    Ok(())
}
