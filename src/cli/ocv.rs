use std::path::PathBuf;

use clap::Parser;

use crate::{core::OcvTable, prelude::*, tables::build_ocv_table};

#[derive(Parser)]
pub struct OcvSourceArgs {
    /// TOML file with `[[point]]` entries, the linear 3.0–4.2 V curve if omitted.
    #[clap(long = "ocv-path", env = "OCV_PATH")]
    pub path: Option<PathBuf>,
}

impl OcvSourceArgs {
    pub fn load(&self) -> Result<OcvTable> {
        self.path.as_ref().map_or_else(|| Ok(OcvTable::default()), OcvTable::from_path)
    }
}

#[derive(Parser)]
pub struct OcvArgs {
    #[clap(flatten)]
    pub source: OcvSourceArgs,

    /// Number of state-of-charge intervals to sample.
    #[clap(long = "n-steps", default_value = "10", env = "OCV_N_STEPS")]
    pub n_steps: usize,
}

pub fn ocv(args: &OcvArgs) -> Result {
    let table = args.source.load()?;
    info!(n_points = table.points().len(), "loaded the curve");
    println!("{}", build_ocv_table(&table, args.n_steps));
    Ok(())
}
