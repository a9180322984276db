use agclimate_processor::cli::{run, Cli};
use agclimate_processor::readers::CsvReader;
use agclimate_processor::utils::DataLayout;
use agclimate_processor::ProcessingError;
use clap::Parser;
use pretty_assertions::assert_eq;
use std::path::Path;
use tempfile::TempDir;

const DAILY_READY: &str = "Date,DewPoint,WeatherType,WindGust,MaxTemp,MinTemp,MaxWindSpeed,Precipitation,AvgTemp,WindSpeed,Elevation,STATION,StationName,Long,Lat,COUNTY,STATE_CODE
2019-01-01,55.0,10000,999.9,80.0,60.0,12.0,0.1,70.0,5.0,30.0,72205012815,ORLANDO INTL,-81.325,28.434,Orange,12
2019-01-02,56.0,,999.9,9999.9,61.0,12.0,0.0,71.0,5.0,30.0,72205012815,ORLANDO INTL,-81.325,28.434,Orange,12
2019-01-03,57.0,,999.9,82.0,62.0,12.0,0.0,72.0,5.0,30.0,72205012815,ORLANDO INTL,-81.325,28.434,Orange,12
2019-01-01,58.0,1,999.9,75.0,9999.9,10.0,99.99,68.0,4.0,2.0,72211012842,TAMPA INTL,-82.533,27.962,Hillsborough,12
2019-01-02,59.0,,999.9,76.0,63.0,10.0,0.2,69.0,4.0,2.0,72211012842,TAMPA INTL,-82.533,27.962,Hillsborough,12
";

const NORMALS_READY: &str = "DATE,normalAvgTemp,normalAvgTempStd,normalMaxTemp,normalMaxTempStd,normalMinTemp,normalMinTempStd,normalMtdPrcp,normalMtdSnow,ELEVATION,STATION,Long,Lat,COUNTY,STATE_CODE
01-01,60.5,5.1,71.0,4.9,50.0,5.5,0.06,,29.0,USW00012815,-81.3249,28.4339,Orange,12
01-02,60.4,5.1,70.9,4.9,49.9,5.5,0.12,,29.0,USW00012815,-81.3249,28.4339,Orange,12
01-03,60.3,5.2,70.8,4.9,49.8,5.6,0.18,,29.0,USW00012815,-81.3249,28.4339,Orange,12
01-01,62.0,5.0,72.0,4.8,52.0,5.4,0.05,,2.0,USW00012842,-82.5369,27.9614,Hillsborough,12
01-02,61.9,5.0,71.9,4.8,51.9,5.4,0.10,,2.0,USW00012842,-82.5369,27.9614,Hillsborough,12
";

fn write(path: &Path, content: &str) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

async fn run_cli(data_dir: &Path, args: &[&str]) -> agclimate_processor::Result<()> {
    let mut argv = vec![
        "agclimate-processor".to_string(),
        "--quiet".to_string(),
        "--state".to_string(),
        "Florida".to_string(),
        "--data-dir".to_string(),
        data_dir.display().to_string(),
    ];
    argv.extend(args.iter().map(|a| a.to_string()));
    run(Cli::try_parse_from(argv).unwrap()).await
}

#[tokio::test]
async fn test_clean_map_merge_impute_pipeline() {
    let temp_dir = TempDir::new().unwrap();
    let layout = DataLayout::new(temp_dir.path(), "Florida");
    write(&layout.daily_ready(), DAILY_READY);
    write(&layout.normals_ready(), NORMALS_READY);

    run_cli(temp_dir.path(), &["clean-daily"]).await.unwrap();
    run_cli(temp_dir.path(), &["map-stations"]).await.unwrap();
    run_cli(temp_dir.path(), &["merge"]).await.unwrap();
    run_cli(temp_dir.path(), &["impute"]).await.unwrap();

    let reader = CsvReader::new();

    let mapping = reader.read_table(&layout.station_mapping()).unwrap();
    assert_eq!(mapping.len(), 2);
    let normal_col = mapping.require_column("NormalStation").unwrap();
    assert_eq!(mapping.value(0, normal_col), "USW00012815");
    assert_eq!(mapping.value(1, normal_col), "USW00012842");

    let combined = reader.read_table(&layout.combined()).unwrap();
    assert_eq!(combined.len(), 5);
    let key_col = combined.require_column("CompositeKey").unwrap();
    assert_eq!(combined.value(0, key_col), "USW00012815-01-01");

    let imputed = reader.read_table(&layout.imputed()).unwrap();
    assert_eq!(imputed.len(), 5);
    assert!(imputed.column_index("STATION").is_none());
    assert!(imputed.column_index("WindGust").is_none());

    let station = imputed.require_column("DailyStation").unwrap();
    let date = imputed.require_column("Date").unwrap();
    let max_temp = imputed.require_column("MaxTemp").unwrap();
    let min_temp = imputed.require_column("MinTemp").unwrap();

    let row = (0..imputed.len())
        .find(|&r| {
            imputed.value(r, station) == "72205012815" && imputed.value(r, date) == "2019-01-02"
        })
        .unwrap();
    assert_eq!(imputed.value(row, max_temp), "81.0");

    let row = (0..imputed.len())
        .find(|&r| {
            imputed.value(r, station) == "72211012842" && imputed.value(r, date) == "2019-01-01"
        })
        .unwrap();
    assert_eq!(imputed.value(row, min_temp), "63.0");
}

#[tokio::test]
async fn test_crop_combine_without_inputs_is_not_an_error() {
    let temp_dir = TempDir::new().unwrap();
    let layout = DataLayout::new(temp_dir.path(), "Florida");

    run_cli(
        temp_dir.path(),
        &["crop-combine", "--start-year", "2010", "--end-year", "2012"],
    )
    .await
    .unwrap();
    assert!(!layout.crops_county_ready().exists());
}

#[tokio::test]
async fn test_inverted_year_range_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let result = run_cli(
        temp_dir.path(),
        &["crop-report", "--start-year", "2021", "--end-year", "2020"],
    )
    .await;
    assert!(matches!(result, Err(ProcessingError::Config(_))));
}

#[tokio::test]
async fn test_missing_input_surfaces_io_error() {
    let temp_dir = TempDir::new().unwrap();
    let result = run_cli(temp_dir.path(), &["clean-daily"]).await;
    assert!(matches!(result, Err(ProcessingError::Io(_))));
}

#[test]
fn test_cli_arguments() {
    let cli = Cli::try_parse_from([
        "agclimate-processor",
        "raster-to-points",
        "--mode",
        "ndvi",
        "--start-year",
        "2012",
        "--end-year",
        "2013",
    ]);
    assert!(cli.is_ok());

    // --output needs --input
    let cli = Cli::try_parse_from(["agclimate-processor", "raster-to-points", "--output", "x.csv"]);
    assert!(cli.is_err());

    let cli = Cli::try_parse_from(["agclimate-processor", "vegscape"]);
    assert!(cli.is_err());
}
