//! binshim launcher
//!
//! Stands in for the wrapped binary: every argument is forwarded verbatim, so
//! this binary has no options of its own. Diagnostics are enabled with
//! `BINSHIM_LOG=debug`, leaving `RUST_LOG` to the wrapped program.

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().filter("BINSHIM_LOG"))
        .format(|buf, record| {
            use std::io::Write;
            writeln!(
                buf,
                "[binshim {} {}:{}] {}",
                record.level(),
                record.file().unwrap_or("unknown"),
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .init();

    binshim::launch::run(std::env::args_os().skip(1).collect())
}
