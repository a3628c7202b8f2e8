use std::path::PathBuf;

use clap::ValueHint;
use nalgebra::Vector3;

use std::str::FromStr;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, clap::ValueEnum)]
pub enum LogFormat {
    Compact,
    Full,
    Pretty,
    Json,
}

impl LogFormat {
    pub const fn name(self) -> &'static str {
        match self {
            LogFormat::Compact => "compact",
            LogFormat::Full => "full",
            LogFormat::Pretty => "pretty",
            LogFormat::Json => "json",
        }
    }
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, clap::Parser)]
#[command(author, version, about)]
pub struct Cli {
    /// Logging output filters; comma-separated
    #[arg(
        short,
        long,
        default_value = "warn,trellis=info,inspect=info",
        env = "INSPECT_LOG_FILTER"
    )]
    pub log_filter: String,
    /// Logging output format
    #[arg(long, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,
    /// Raw little-endian VEC3 positions to draw instead of the built-in quad
    #[arg(short, long, value_hint = ValueHint::FilePath)]
    pub buffer: Option<PathBuf>,
    /// URI of raw VEC3 positions to fetch in the background, drawn as a second entity
    #[arg(short, long)]
    pub uri: Option<String>,
    /// Number of VEC3 positions the `--uri` buffer holds
    #[arg(long, default_value_t = 3, requires = "uri")]
    pub uri_vertices: usize,
    /// Number of instances to draw of the main entity; 0 disables instancing
    #[arg(short, long, default_value_t = 0)]
    pub instances: u32,
    /// Translation of the main entity
    #[arg(
        short,
        long,
        default_value = "0,0,0",
        value_parser = parse_vec3::<f32>,
        value_name = "X,Y,Z"
    )]
    pub translation: Vector3<f32>,
    /// Scale of the main entity
    #[arg(
        short,
        long,
        default_value = "1,1,1",
        value_parser = parse_vec3::<f32>,
        value_name = "X,Y,Z"
    )]
    pub scale: Vector3<f32>,
    /// Frames to run before exiting
    #[arg(short, long, default_value_t = 3)]
    pub frames: u32,
}

#[derive(Debug, thiserror::Error)]
#[error("expected three comma-separated components, found {0}")]
struct ComponentCount(usize);

fn parse_vec3<R: FromStr>(
    s: &str,
) -> Result<Vector3<R>, Box<dyn std::error::Error + Send + Sync + 'static>>
where
    <R as FromStr>::Err: std::error::Error + Send + Sync + 'static,
{
    let parts: Vec<&str> = s.trim().split(',').map(str::trim).collect();
    let [x, y, z] = parts.as_slice() else {
        return Err(ComponentCount(parts.len()).into());
    };
    Ok(nalgebra::vector![R::from_str(x)?, R::from_str(y)?, R::from_str(z)?])
}

impl Cli {
    /// Install the global log subscriber.
    pub(crate) fn initialize_tracing(&self) {
        let offset = time::UtcOffset::current_local_offset();
        let tsub = tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_timer(tracing_subscriber::fmt::time::OffsetTime::new(
                *offset.as_ref().unwrap_or(&time::UtcOffset::UTC),
                time::macros::format_description!("[hour]:[minute]:[second].[subsecond digits:3]"),
            ))
            .with_thread_ids(true)
            .with_thread_names(true)
            .with_env_filter(self.log_filter.as_str());

        match self.log_format {
            LogFormat::Compact => tsub.compact().init(),
            LogFormat::Full => tsub.init(),
            LogFormat::Pretty => tsub.pretty().init(),
            LogFormat::Json => tsub.json().init(),
        }

        if let Err(e) = offset {
            tracing::warn!(error = %e, "couldn't get local time offset; logging in UTC");
        }
    }
}
