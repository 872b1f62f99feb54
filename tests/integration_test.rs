use ndarray::Array3;
use netcdf::create;
use shapefile::dbase::{FieldName, FieldValue, Record, TableWriterBuilder};
use shapefile::{Point, Polygon, PolygonRing};
use std::path::Path;
use tempfile::tempdir;
use zonal_stats::{
    export_table, extract, load_grid, load_grid_with_diagnostics, load_region_set,
    ExtractOptions, MembershipPolicy, StatOperation, ZonalError, ZonalValue,
};

/// 2 time steps on a 3 x 4 grid of unit cells spanning lon 0..4, lat 0..3.
/// Latitude is stored north to south; -999 marks missing cells.
fn write_grid_file(path: &Path) {
    let mut file = create(path).expect("Failed to create NetCDF file");

    file.add_dimension("time", 2).expect("Failed to add dimension time");
    file.add_dimension("lat", 3).expect("Failed to add dimension lat");
    file.add_dimension("lon", 4).expect("Failed to add dimension lon");

    let mut time = file
        .add_variable::<f64>("time", &["time"])
        .expect("Failed to add time");
    time.put_attribute("units", "days since 2020-01-01")
        .expect("Failed to add units");
    time.put_values(&[0.0, 1.0], ..).expect("Failed to write time");

    let mut lat = file
        .add_variable::<f64>("lat", &["lat"])
        .expect("Failed to add lat");
    lat.put_values(&[2.5, 1.5, 0.5], ..).expect("Failed to write lat");

    let mut lon = file
        .add_variable::<f64>("lon", &["lon"])
        .expect("Failed to add lon");
    lon.put_values(&[0.5, 1.5, 2.5, 3.5], ..)
        .expect("Failed to write lon");

    let data: Vec<f32> = vec![
        // time=0
        1.0, 2.0, 3.0, 4.0, //
        5.0, 6.0, 7.0, 8.0, //
        9.0, 10.0, 11.0, -999.0, //
        // time=1
        -999.0, -999.0, 0.0, 0.0, //
        -999.0, -999.0, 0.0, 0.0, //
        0.0, 0.0, 0.0, 0.0,
    ];
    let mut var = file
        .add_variable::<f32>("precip", &["time", "lat", "lon"])
        .expect("Failed to add variable");
    var.put_attribute("_FillValue", -999.0f32)
        .expect("Failed to add fill value");
    var.put_attribute("units", "mm").expect("Failed to add units");
    let array = Array3::from_shape_vec((2, 3, 4), data).expect("Failed to shape data");
    var.put(array.view(), ..).expect("Failed to write data");
}

/// Climate-model style file: a single latitude row whose width comes from CF
/// bounds, a 360-day calendar, and distinct `_FillValue` and `missing_value`.
fn write_model_file(path: &Path) {
    let mut file = create(path).expect("Failed to create NetCDF file");

    file.add_dimension("time", 2).expect("Failed to add dimension time");
    file.add_dimension("lat", 1).expect("Failed to add dimension lat");
    file.add_dimension("lon", 3).expect("Failed to add dimension lon");
    file.add_dimension("nv", 2).expect("Failed to add dimension nv");

    let mut time = file
        .add_variable::<f64>("time", &["time"])
        .expect("Failed to add time");
    time.put_attribute("units", "days since 2000-01-01")
        .expect("Failed to add units");
    time.put_attribute("calendar", "360_day")
        .expect("Failed to add calendar");
    time.put_values(&[0.0, 360.0], ..).expect("Failed to write time");

    let mut lat = file
        .add_variable::<f64>("lat", &["lat"])
        .expect("Failed to add lat");
    lat.put_attribute("bounds", "lat_bnds")
        .expect("Failed to add bounds");
    lat.put_values(&[1.5], ..).expect("Failed to write lat");

    let mut lat_bnds = file
        .add_variable::<f64>("lat_bnds", &["lat", "nv"])
        .expect("Failed to add lat_bnds");
    lat_bnds
        .put_values(&[1.0, 2.0], ..)
        .expect("Failed to write lat_bnds");

    let mut lon = file
        .add_variable::<f64>("lon", &["lon"])
        .expect("Failed to add lon");
    lon.put_values(&[0.5, 1.5, 2.5], ..).expect("Failed to write lon");

    let data: Vec<f32> = vec![
        1.0, -999.0, 1e20, // time=0
        2.0, 4.0, 1e20, // time=1
    ];
    let mut var = file
        .add_variable::<f32>("tas", &["time", "lat", "lon"])
        .expect("Failed to add variable");
    var.put_attribute("_FillValue", -999.0f32)
        .expect("Failed to add fill value");
    var.put_attribute("missing_value", 1e20f32)
        .expect("Failed to add missing value");
    let array = Array3::from_shape_vec((2, 1, 3), data).expect("Failed to shape data");
    var.put(array.view(), ..).expect("Failed to write data");
}

/// Clockwise (shapefile exterior) rectangle
fn rectangle(x0: f64, y0: f64, x1: f64, y1: f64) -> Polygon {
    Polygon::with_rings(vec![PolygonRing::Outer(vec![
        Point::new(x0, y0),
        Point::new(x0, y1),
        Point::new(x1, y1),
        Point::new(x1, y0),
        Point::new(x0, y0),
    ])])
}

fn write_regions_file(path: &Path, label_field: &str, shapes: &[(Polygon, &str, &str)]) {
    let builder = TableWriterBuilder::new()
        .add_character_field(FieldName::try_from(label_field).expect("field name"), 20)
        .add_character_field(FieldName::try_from("district").expect("field name"), 20);
    let mut writer =
        shapefile::Writer::from_path(path, builder).expect("Failed to create shapefile");

    for (polygon, state, district) in shapes {
        let mut record = Record::default();
        record.insert(
            label_field.to_string(),
            FieldValue::Character(Some((*state).to_string())),
        );
        record.insert(
            "district".to_string(),
            FieldValue::Character(Some((*district).to_string())),
        );
        writer
            .write_shape_and_record(polygon, &record)
            .expect("Failed to write shape");
    }
}

fn value(v: ZonalValue) -> f64 {
    match v {
        ZonalValue::Value(x) => x,
        ZonalValue::NoData => panic!("expected a value, found no data"),
    }
}

#[test]
fn test_netcdf_grid_loading() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let grid_path = temp_dir.path().join("grid.nc");
    write_grid_file(&grid_path);

    let mut described = None;
    let grid = load_grid_with_diagnostics(&grid_path, "precip", |m| {
        described = Some((m.name.clone(), m.shape(), m.missing_values.clone()));
    })
    .expect("Failed to load grid");

    assert_eq!(
        described,
        Some(("precip".to_string(), vec![2, 3, 4], vec![-999.0]))
    );
    assert_eq!(grid.layer_count(), 2);
    assert_eq!((grid.rows(), grid.cols()), (3, 4));
    assert_eq!(grid.layer_names(), &["2020-01-01", "2020-01-02"]);

    // Row 0 is the northern edge
    let top_left = grid.cell_at(0, 0).unwrap();
    assert_eq!((top_left.min().x, top_left.max().y), (0.0, 3.0));
    assert_eq!(grid.value_at(0, 0, 0).unwrap(), Some(1.0));
    assert_eq!(grid.value_at(0, 2, 3).unwrap(), None);

    let missing = load_grid(&grid_path, "temperature");
    match missing {
        Err(ZonalError::VariableNotFound { var }) => assert_eq!(var, "temperature"),
        other => panic!("Expected VariableNotFound error, got {other:?}"),
    }
}

#[test]
fn test_end_to_end_extraction_and_export() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let grid_path = temp_dir.path().join("grid.nc");
    let regions_path = temp_dir.path().join("regions.shp");
    let csv_path = temp_dir.path().join("out.csv");
    write_grid_file(&grid_path);
    write_regions_file(
        &regions_path,
        "state",
        &[
            (rectangle(0.0, 1.0, 2.0, 3.0), "North", "West"),
            (rectangle(50.0, 50.0, 51.0, 51.0), "Far", "Away"),
            (rectangle(0.0, 0.0, 4.0, 3.0), "All", "Cells"),
        ],
    );

    let grid = load_grid(&grid_path, "precip").expect("Failed to load grid");
    let regions =
        load_region_set(&regions_path, "state", "district").expect("Failed to load regions");
    let options = ExtractOptions::new(StatOperation::Mean.unweighted());
    let table = extract(&grid, &regions, "state", "district", &options).expect("extract");

    assert_eq!(table.column_names(), vec!["state", "district", "2020-01-01", "2020-01-02"]);
    let states: Vec<&str> = table.rows.iter().map(|r| r.state.as_str()).collect();
    assert_eq!(states, vec!["North", "Far", "All"]);

    // Top-left 2x2 block: 1, 2, 5, 6; second layer fully missing there
    assert_eq!(value(table.rows[0].values[0]), 3.5);
    assert_eq!(table.rows[0].values[1], ZonalValue::NoData);

    // Disjoint region keeps its position with no data
    assert!(table.rows[1].values.iter().all(|v| v.is_no_data()));

    // Whole grid: mean of the 11 valid cells of layer 0, 8 zeros of layer 1
    assert!((value(table.rows[2].values[0]) - 66.0 / 11.0).abs() < 1e-9);
    assert_eq!(value(table.rows[2].values[1]), 0.0);

    assert!(export_table(&table, Some(&csv_path)).expect("export"));
    let csv = std::fs::read_to_string(&csv_path).expect("read csv");
    let mut lines = csv.lines();
    assert_eq!(lines.next(), Some("state,district,2020-01-01,2020-01-02"));
    assert_eq!(csv.lines().count(), 4);
    assert!(csv.lines().nth(2).unwrap().starts_with("Far,Away,"));

    assert!(!export_table(&table, None).expect("skip export"));
}

#[test]
fn test_fractional_extraction_from_files() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let grid_path = temp_dir.path().join("grid.nc");
    let regions_path = temp_dir.path().join("regions.shp");
    write_grid_file(&grid_path);
    // Covers the right half of cell (0, 0) and the left half of cell (0, 1)
    write_regions_file(
        &regions_path,
        "state",
        &[(rectangle(0.5, 2.0, 1.5, 3.0), "A", "X")],
    );

    let grid = load_grid(&grid_path, "precip").unwrap();
    let regions = load_region_set(&regions_path, "state", "district").unwrap();
    let options = ExtractOptions::new(StatOperation::Mean.weighted())
        .with_policy(MembershipPolicy::Fractional);
    let table = extract(&grid, &regions, "state", "district", &options).unwrap();

    assert!((value(table.rows[0].values[0]) - 1.5).abs() < 1e-9);
}

#[test]
fn test_renamed_label_field_fails_before_extraction() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let regions_path = temp_dir.path().join("regions.shp");
    write_regions_file(
        &regions_path,
        "region",
        &[
            (rectangle(0.0, 0.0, 1.0, 1.0), "A", "X"),
            (rectangle(1.0, 0.0, 2.0, 1.0), "B", "Y"),
        ],
    );

    match load_region_set(&regions_path, "state", "district") {
        Err(ZonalError::RegionFieldMissing { field, region_id }) => {
            assert_eq!(field, "state");
            assert_eq!(region_id, 0);
        }
        other => panic!("Expected RegionFieldMissing error, got {other:?}"),
    }

    let regions = load_region_set(&regions_path, "region", "district").unwrap();
    assert_eq!(regions.len(), 2);
}

#[test]
fn test_model_file_calendar_bounds_and_missing_markers() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let grid_path = temp_dir.path().join("model.nc");
    let regions_path = temp_dir.path().join("regions.shp");
    write_model_file(&grid_path);
    write_regions_file(
        &regions_path,
        "state",
        &[(rectangle(0.0, 1.0, 3.0, 2.0), "Band", "All")],
    );

    let mut markers = Vec::new();
    let grid = load_grid_with_diagnostics(&grid_path, "tas", |m| {
        markers = m.missing_values.clone();
    })
    .expect("Failed to load grid");
    assert_eq!(markers, vec![-999.0, f64::from(1e20f32)]);

    // One row, one unit tall, from the latitude bounds
    assert_eq!((grid.rows(), grid.cols()), (1, 3));
    assert_eq!(grid.cell_size(), (1.0, 1.0));
    let cell = grid.cell_at(0, 0).unwrap();
    assert_eq!((cell.min().y, cell.max().y), (1.0, 2.0));

    // 360-day calendar: day 360 is the first day of the next year
    assert_eq!(grid.layer_names(), &["2000-01-01", "2001-01-01"]);

    assert_eq!(grid.value_at(0, 0, 1).unwrap(), None);
    assert_eq!(grid.value_at(0, 0, 2).unwrap(), None);

    let regions = load_region_set(&regions_path, "state", "district").unwrap();
    let table = extract(&grid, &regions, "state", "district", &ExtractOptions::default()).unwrap();
    assert_eq!(value(table.rows[0].values[0]), 1.0);
    assert_eq!(value(table.rows[0].values[1]), 3.0);
}
