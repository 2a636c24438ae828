use clap::Parser;
use std::fs;
use std::path::PathBuf;
use tacmapgen::{GenerationParams, generate};

/// Генератор тактических карт
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Путь к конфигурационному файлу в формате TOML
    #[arg(short, long)]
    config: PathBuf,

    /// Каталог для превью и результата (по умолчанию: текущий)
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let cli = Cli::parse();

    let params = GenerationParams::from_toml_file(cli.config.to_str().ok_or("bad config path")?)?;

    println!(
        "Генерация карты {}×{} (сид {})...",
        params.width,
        params.height,
        params.seed.value()
    );
    let result = generate(&params)?;

    fs::create_dir_all(&cli.output_dir)?;
    let out = |name: &str| {
        cli.output_dir
            .join(name)
            .to_str()
            .map(String::from)
            .ok_or("bad output path")
    };

    result.geology.save_as_png(&out("geology.png")?)?;
    result.topography.save_as_png(&out("elevation.png")?)?;
    result.hydrology.save_as_png(&out("hydrology.png")?)?;
    fs::write(out("map.json")?, serde_json::to_string_pretty(&result)?)?;

    println!(
        "Готово: высоты {:.1}–{:.1} футов, ручьёв {}, деревьев {}",
        result.statistics.min_elevation,
        result.statistics.max_elevation,
        result.statistics.stream_tile_count,
        result.statistics.tree_count
    );
    for warning in &result.warnings {
        println!("Предупреждение: {warning:?}");
    }
    Ok(())
}
