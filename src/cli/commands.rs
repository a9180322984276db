use crate::cli::args::{Cli, Commands, PointMode, YearRange};
use crate::config::PipelineConfig;
use crate::download::{DownloadOutcome, VegScapeClient};
use crate::error::{ProcessingError, Result};
use crate::processors::crop_mapper::read_legend;
use crate::processors::{
    CropCountyCombiner, CropCountyMapper, CropReportCombiner, CropStationMapper, DailyCleaner,
    DailyShaper, DataMerger, Imputer, NormalsShaper, RasterConverter, RasterMode, RawCombiner,
    StationMapper, YearlyRunReport,
};
use crate::readers::CountyLocator;
use crate::utils::filename::DataLayout;
use crate::utils::progress::ProgressReporter;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use tracing::{info, Level};

pub fn init_logging(verbose: bool, quiet: bool, log_file: Option<&Path>) -> Result<()> {
    let level = if verbose {
        Level::DEBUG
    } else if quiet {
        Level::WARN
    } else {
        Level::INFO
    };
    let builder = tracing_subscriber::fmt().with_max_level(level).with_target(false);

    let initialised = match log_file {
        Some(path) => builder
            .with_ansi(false)
            .with_writer(Mutex::new(File::create(path)?))
            .try_init(),
        None => builder.with_writer(std::io::stderr).try_init(),
    };
    initialised.map_err(|e| ProcessingError::Config(format!("logging: {}", e)))
}

/// Loaded settings with the global CLI flags applied.
struct Context {
    config: PipelineConfig,
    layout: DataLayout,
    quiet: bool,
}

impl Context {
    fn from_cli(cli: &Cli) -> Result<Self> {
        let mut config = PipelineConfig::load(cli.config.as_deref())?;
        if let Some(state) = &cli.state {
            config.state = state.clone();
        }
        if let Some(data_dir) = &cli.data_dir {
            config.data_dir = data_dir.clone();
        }
        if let Some(max_workers) = cli.max_workers {
            config.max_workers = max_workers;
        }
        let config = config.validated()?;
        let layout = config.layout();

        Ok(Self {
            config,
            layout,
            quiet: cli.quiet,
        })
    }

    fn years(&self, range: YearRange) -> Result<Vec<i32>> {
        if range.start_year.is_none() && range.end_year.is_none() {
            return Ok(self.config.crop_years());
        }
        let start = range.start_year.unwrap_or(self.config.crop_start_year);
        let end = range.end_year.unwrap_or(self.config.crop_end_year);
        if start > end {
            return Err(ProcessingError::Config(format!(
                "start year {} is after end year {}",
                start, end
            )));
        }
        Ok((start..=end).collect())
    }

    fn progress(&self, total: usize, stage: &str) -> ProgressReporter {
        ProgressReporter::new(total as u64, stage, self.quiet)
    }

    fn spinner(&self, message: &str) -> ProgressReporter {
        ProgressReporter::new_spinner(message, self.quiet)
    }

    fn shapefile(&self, explicit: Option<PathBuf>) -> PathBuf {
        explicit.unwrap_or_else(|| self.config.county_shapefile_path())
    }
}

/// Run CPU-bound stage work off the async executor.
async fn blocking<T, F>(work: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(work).await?
}

fn print_yearly(report: &YearlyRunReport) {
    println!("\n{}", report.summary());
}

/// Execute one subcommand. Logging is set up by the caller.
pub async fn run(cli: Cli) -> Result<()> {
    let ctx = Context::from_cli(&cli)?;
    info!(
        "State: {}, data directory: {}",
        ctx.config.state,
        ctx.config.data_dir.display()
    );

    match cli.command {
        Commands::CombineRaw {
            year_ranges,
            output,
        } => {
            let ranges = year_ranges.unwrap_or_else(|| ctx.config.year_ranges.clone());
            let output = output.unwrap_or_else(|| ctx.layout.daily_raw());
            let progress = ctx.progress(ranges.len(), "combine-raw");
            let report = RawCombiner::new(ranges).run(&ctx.layout, &output, &progress)?;
            println!("\n{}", report.summary());
        }

        Commands::ShapeDaily {
            input,
            shapefile,
            output,
            stations_output,
        } => {
            let input = input.unwrap_or_else(|| ctx.layout.daily_raw());
            let shapefile = ctx.shapefile(shapefile);
            let output = output.unwrap_or_else(|| ctx.layout.daily_ready());
            let stations = stations_output.unwrap_or_else(|| ctx.layout.daily_stations());

            let progress = ctx.spinner("Shaping daily data...");
            let result = blocking(move || {
                DailyShaper::new().run(&input, &shapefile, &output, &stations)
            })
            .await?;
            progress.finish_with_message("Daily data shaped");
            println!("\n{}", result.summary("Daily"));
        }

        Commands::ShapeNormals {
            input,
            shapefile,
            output,
            stations_output,
        } => {
            let input = input.unwrap_or_else(|| ctx.layout.normals_raw());
            let shapefile = ctx.shapefile(shapefile);
            let output = output.unwrap_or_else(|| ctx.layout.normals_ready());
            let stations = stations_output.unwrap_or_else(|| ctx.layout.normals_stations());

            let progress = ctx.spinner("Shaping normals data...");
            let result = blocking(move || {
                NormalsShaper::new().run(&input, &shapefile, &output, &stations)
            })
            .await?;
            progress.finish_with_message("Normals data shaped");
            println!("\n{}", result.summary("Normals"));
        }

        Commands::CleanDaily { input, output } => {
            let input = input.unwrap_or_else(|| ctx.layout.daily_ready());
            let output = output.unwrap_or_else(|| ctx.layout.daily_cleaned());
            let report = blocking(move || DailyCleaner::new().run(&input, &output)).await?;
            println!("\n{}", report.summary());
        }

        Commands::MapStations {
            daily,
            normals,
            output,
            geojson,
            utm_zone,
        } => {
            let daily = daily.unwrap_or_else(|| ctx.layout.daily_cleaned());
            let normals = normals.unwrap_or_else(|| ctx.layout.normals_ready());
            let output = output.unwrap_or_else(|| ctx.layout.station_mapping());
            let mapper = StationMapper::new().with_utm_zone(utm_zone.or(ctx.config.utm_zone));

            let report = blocking(move || {
                mapper.run(&daily, &normals, &output, geojson.as_deref())
            })
            .await?;
            println!("\n{}", report.summary());
        }

        Commands::Merge {
            daily,
            normals,
            mapping,
            output,
            geojson,
        } => {
            let daily = daily.unwrap_or_else(|| ctx.layout.daily_cleaned());
            let normals = normals.unwrap_or_else(|| ctx.layout.normals_ready());
            let mapping = mapping.unwrap_or_else(|| ctx.layout.station_mapping());
            let output = output.unwrap_or_else(|| ctx.layout.combined());

            let progress = ctx.spinner("Merging daily data with normals...");
            let (report, connections) = blocking(move || {
                DataMerger::new().run(&daily, &normals, &mapping, &output, geojson.as_deref())
            })
            .await?;
            progress.finish_with_message("Merge complete");
            println!("\n{}", report.summary());
            println!("{}", connections.summary());
        }

        Commands::Impute {
            input,
            output,
            window,
        } => {
            let input = input.unwrap_or_else(|| ctx.layout.combined());
            let output = output.unwrap_or_else(|| ctx.layout.imputed());
            let window = window.unwrap_or(ctx.config.imputation_window);
            if window == 0 {
                return Err(ProcessingError::Config("window must be at least 1".to_string()));
            }
            let imputer = Imputer::new(window, ctx.config.max_workers);
            let progress = ctx.spinner("Imputing missing values...");

            let (report, progress) = blocking(move || {
                let report = imputer.run(&input, &output, &progress)?;
                Ok((report, progress))
            })
            .await?;
            progress.finish_with_message("Imputation complete");
            println!("\n{}", report.summary());
        }

        Commands::RasterToPoints {
            mode,
            input,
            output,
            legend,
            year,
            years,
        } => {
            let legend_path = legend.unwrap_or_else(|| ctx.layout.crop_legend());
            let converter = RasterConverter::new();

            match (mode, input) {
                (PointMode::Crop, Some(input)) => {
                    let year = year.ok_or_else(|| {
                        ProcessingError::Config("--year is required for a single crop raster".to_string())
                    })?;
                    let output = output.unwrap_or_else(|| {
                        ctx.layout.crop_points_dir().join(ctx.layout.crop_points_name(year))
                    });
                    let info = blocking(move || {
                        let legend = read_legend(&legend_path)?;
                        converter.convert(RasterMode::Crop, &input, &output, Some(&legend), Some(year))
                    })
                    .await?;
                    println!("\n{}", info.summary());
                }
                (PointMode::Ndvi, Some(input)) => {
                    let output = match (output, year) {
                        (Some(output), _) => output,
                        (None, Some(year)) => ctx.layout.ndvi_points(year),
                        (None, None) => input.with_extension("csv"),
                    };
                    let info = blocking(move || {
                        converter.convert(RasterMode::Ndvi, &input, &output, None, None)
                    })
                    .await?;
                    println!("\n{}", info.summary());
                }
                (mode, None) => {
                    let years = ctx.years(years)?;
                    let progress = ctx.progress(years.len(), "raster-to-points");
                    let layout = ctx.layout.clone();
                    let report = blocking(move || match mode {
                        PointMode::Crop => {
                            let legend = read_legend(&legend_path)?;
                            converter.convert_crop_years(&layout, &legend, &years, &progress)
                        }
                        PointMode::Ndvi => converter.convert_ndvi_years(&layout, &years, &progress),
                    })
                    .await?;
                    print_yearly(&report);
                }
            }
        }

        Commands::CropCounty { shapefile, years } => {
            let years = ctx.years(years)?;
            let shapefile = ctx.shapefile(shapefile);
            let layout = ctx.layout.clone();
            let max_workers = ctx.config.max_workers;
            let progress = ctx.progress(years.len(), "crop-county");

            let report = blocking(move || {
                let locator = CountyLocator::from_shapefile(&shapefile)?;
                info!("Loaded {} county polygons", locator.len());
                CropCountyMapper::new(locator, max_workers).run(&layout, &years, &progress)
            })
            .await?;
            print_yearly(&report);
        }

        Commands::CropStation {
            mapping,
            utm_zone,
            years,
        } => {
            let years = ctx.years(years)?;
            let mapping = mapping.unwrap_or_else(|| ctx.layout.station_mapping());
            let utm_zone = utm_zone.or(ctx.config.utm_zone);
            let layout = ctx.layout.clone();
            let max_workers = ctx.config.max_workers;
            let progress = ctx.progress(years.len(), "crop-station");

            let report = blocking(move || {
                CropStationMapper::from_mapping_file(&mapping, utm_zone, max_workers)?
                    .run(&layout, &years, &progress)
            })
            .await?;
            print_yearly(&report);
        }

        Commands::CropCombine { output, years } => {
            let years = ctx.years(years)?;
            let output = output.unwrap_or_else(|| ctx.layout.crops_county_ready());
            let progress = ctx.progress(years.len(), "crop-combine");
            let report = CropCountyCombiner::new().run(&ctx.layout, &years, &output, &progress)?;
            println!("\n{}", report.summary());
        }

        Commands::CropReport { output, years } => {
            let years = ctx.years(years)?;
            let (first, last) = (years[0], years[years.len() - 1]);
            let output = output.unwrap_or_else(|| ctx.layout.crop_report_combined(first, last));
            let progress = ctx.progress(years.len(), "crop-report");
            let report = CropReportCombiner::new()?.run(&ctx.layout, &years, &output, &progress)?;
            println!("\n{}", report.summary());
        }

        Commands::Vegscape {
            fips,
            date,
            weekly_ndvi,
            date_range,
            output_dir,
            timeout,
            insecure,
        } => {
            let output_dir = output_dir.unwrap_or_else(|| ctx.layout.ndvi_output_dir());
            let client = VegScapeClient::new(Duration::from_secs(timeout), insecure)?;
            let progress = ctx.spinner("Downloading...");

            let outcome = match (weekly_ndvi, date_range, date) {
                (Some(weekly), Some(range), _) => {
                    client
                        .fetch_ndvi_tile(&weekly, &range, &fips, &output_dir, &progress)
                        .await?
                }
                (_, _, Some(date)) => {
                    client
                        .fetch_getfile(&fips, &date, &output_dir, &progress)
                        .await?
                }
                _ => {
                    return Err(ProcessingError::Config(
                        "pass --date for GetFile or --weekly-ndvi with --date-range for a cached tile"
                            .to_string(),
                    ))
                }
            };

            match outcome {
                DownloadOutcome::Saved { path, bytes } => {
                    progress.finish_with_message("Download complete");
                    println!("Saved {} bytes to {}", bytes, path.display());
                }
                DownloadOutcome::Unavailable => {
                    progress.finish_with_message("No data");
                    println!("Data retrieval was not successful.");
                }
                DownloadOutcome::Failed { kind, message } => {
                    progress.finish_with_message("Download failed");
                    println!("{}: {}", kind, message);
                }
            }
        }
    }

    Ok(())
}
