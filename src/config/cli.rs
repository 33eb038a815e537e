use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "rakurank", about = "Rakuten listing scraper with ranking back-query")]
pub struct Args {
    /// Path to the JSON config file
    #[arg(long, default_value = "scraper_config.json")]
    pub config_file: String,

    /// Override the search keyword from the config file
    #[arg(long)]
    pub keyword: Option<String>,

    /// Directory for the output manifests
    #[arg(long, default_value = "data")]
    pub data_dir: std::path::PathBuf,
}
