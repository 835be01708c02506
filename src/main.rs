use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use lockstep_vm::Simulator;

#[derive(Parser)]
#[command(name = "lockstep", about = "Line-by-line simulator for two toy instruction sets")]
struct Args {
    /// Instruction set to simulate.
    #[arg(short, long, global = true, value_enum, default_value = "a64")]
    arch: Arch,
    /// Print the final register and flag state after the run.
    #[arg(short, long, global = true)]
    show_state: bool,
    /// Emit the run result and final state as JSON instead of plain text.
    #[arg(short, long, global = true)]
    json: bool,
    #[command(subcommand)]
    action: Action,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Arch {
    /// Reduced ARM64-like set (X registers, NZCV flags).
    A64,
    /// Reduced x86-64-like set (R registers, eflags).
    X64,
}

#[derive(Subcommand)]
enum Action {
    /// Execute an assembly source file and print its trace.
    Run { path: PathBuf },
}

fn main() -> anyhow::Result<()> {
    let Args {
        arch,
        show_state,
        json,
        action,
    } = Args::parse();

    match action {
        Action::Run { path } => {
            let source = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;

            let mut sim = match arch {
                Arch::A64 => Simulator::aarch64(),
                Arch::X64 => Simulator::x86_64(),
            };
            let result = sim.execute(&source);

            if json {
                let state = serde_json::json!({
                    "result": result,
                    "registers": sim.register_state(),
                    "flags": sim.flags_state(),
                });
                println!("{}", serde_json::to_string_pretty(&state)?);
            } else {
                println!("{}", result.output);
                if show_state {
                    print_state(&sim);
                }
            }

            if !result.success {
                anyhow::bail!(result
                    .error
                    .unwrap_or_else(|| "execution failed".to_string()));
            }
        }
    }

    Ok(())
}

fn print_state(sim: &Simulator) {
    println!();
    println!("========== FINAL STATE ===========");
    println!();
    for (name, view) in sim.register_state() {
        let marker = if view.modified { "*" } else { " " };
        println!("{marker} {name:<4} {} ({})", view.hex, view.value);
    }
    println!();
    for (flag, set) in sim.flags_state() {
        print!("{flag}={} ", u8::from(set));
    }
    println!();
}
