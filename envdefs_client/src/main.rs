use envdefs::render::{write_compiler_flags, write_json};
use envdefs::{
    BuildConfig, CargoDirectives, CompiledProbe, DefineSet, Environment, HostPlatform, Injector,
};
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

mod install;
mod settings;

use install::Outcome;
use settings::{Location, OutputFormat, Settings};

fn main() -> Result<(), anyhow::Error> {
    // stdout carries the rendered definitions
    let printer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_ansi(true)
        .with_writer(std::io::stderr);

    let filter = EnvFilter::builder();

    let filter = if std::env::var("RUST_LOG").is_ok() {
        eprintln!("loaded logger directives from `RUST_LOG` env");

        filter.from_env()?
    } else {
        filter.parse("info")?
    };

    tracing_subscriber::registry()
        .with(printer)
        .with(filter)
        .init();

    let env = Environment::from_os();
    let location = Location::from_env(&env)?;

    match install::ensure_dotenv(
        &env,
        &location,
        &CompiledProbe,
        &HostPlatform::detect(),
        install::confirm_on_terminal,
    )? {
        Outcome::Continue => {}
        Outcome::Exit(code) => std::process::exit(code),
    }

    #[cfg(feature = "dotenv")]
    let env = {
        let mut env = env;
        env.overlay_dotenv_file(&location.env_file)?;
        env
    };

    let settings = Settings::from_env(&env)?;

    let injector = Injector::new(settings.injector_config());
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    if settings.format == OutputFormat::Cargo {
        let mut directives = CargoDirectives::new(&mut out);
        injector.inject(&env, &mut directives);
        if location.env_file.exists() {
            directives.rerun_if_changed(&location.env_file)?;
        }
        info!(count = directives.definitions().len(), "Injection finished");
        return Ok(());
    }

    let mut defines = DefineSet::new();
    injector.inject(&env, &mut defines);
    info!(count = defines.len(), format = ?settings.format, "Injection finished");

    match settings.format {
        OutputFormat::Json => write_json(&mut out, defines.definitions())?,
        _ => write_compiler_flags(&mut out, defines.definitions())?,
    }

    Ok(())
}
