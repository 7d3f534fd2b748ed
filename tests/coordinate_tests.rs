use photo_geotagger::core::coordinate::{
    self, Coordinate, CoordinateError,
};

#[test]
fn parses_signed_decimal_pair() {
    let coord = coordinate::parse("52.52, 13.40").expect("should parse decimal pair");
    assert!((coord.lat - 52.52).abs() < 1e-9);
    assert!((coord.lon - 13.40).abs() < 1e-9);

    let spaced = coordinate::parse("-33.86  151.21").expect("should parse whitespace-separated");
    assert!((spaced.lat + 33.86).abs() < 1e-9);
    assert!((spaced.lon - 151.21).abs() < 1e-9);
}

#[test]
fn parses_dms_notation() {
    let coord =
        coordinate::parse("52°31'12\"N 13°24'18\"E").expect("should parse ASCII DMS");
    assert!((coord.lat - (52.0 + 31.0 / 60.0 + 12.0 / 3600.0)).abs() < 1e-9);
    assert!((coord.lon - (13.0 + 24.0 / 60.0 + 18.0 / 3600.0)).abs() < 1e-9);

    let typographic = coordinate::parse("33°52′00″S, 151°12′36″E")
        .expect("should parse typographic DMS marks");
    assert!(typographic.lat < 0.0);
    assert!(typographic.lon > 0.0);
}

#[test]
fn parses_dmm_notation() {
    let coord = coordinate::parse("52°31.2′N, 13°24.3′E").expect("should parse DMM");
    assert!((coord.lat - (52.0 + 31.2 / 60.0)).abs() < 1e-9);
    assert!((coord.lon - (13.0 + 24.3 / 60.0)).abs() < 1e-9);
}

#[test]
fn rejects_out_of_range_and_malformed_input() {
    assert!(matches!(
        coordinate::parse("91.0, 10.0"),
        Err(CoordinateError::LatitudeOutOfRange(_))
    ));
    assert!(matches!(
        coordinate::parse("45.0, 181.0"),
        Err(CoordinateError::LongitudeOutOfRange(_))
    ));
    assert!(matches!(
        coordinate::parse("52°61'12\"N 13°24'18\"E"),
        Err(CoordinateError::MinutesOutOfRange(_))
    ));
    assert!(matches!(
        coordinate::parse("52°31'60\"N 13°24'18\"E"),
        Err(CoordinateError::SecondsOutOfRange(_))
    ));
    assert!(matches!(coordinate::parse(""), Err(CoordinateError::Empty)));
    assert!(matches!(
        coordinate::parse("somewhere north of Berlin"),
        Err(CoordinateError::Unrecognized(_))
    ));
}

#[test]
fn canonical_form_carries_hemisphere_refs_and_fixed6_string() {
    let canonical = coordinate::to_canonical(Coordinate {
        lat: -33.8688,
        lon: 151.2093,
    });

    assert_eq!(canonical.lat_ref, 'S');
    assert_eq!(canonical.lon_ref, 'E');
    assert!((canonical.lat_abs - 33.8688).abs() < 1e-9);
    assert_eq!(canonical.pos_string, "-33.868800, 151.209300");

    let berlin = coordinate::to_canonical(Coordinate {
        lat: 52.52,
        lon: 13.40,
    });
    assert_eq!(berlin.lat_ref, 'N');
    assert_eq!(berlin.lon_ref, 'E');
    assert_eq!(berlin.pos_string, "52.520000, 13.400000");
}

#[test]
fn dms_round_trip_is_exact_within_tolerance() {
    let samples = [
        0.0, 0.5, 13.405, 45.0, 52.516667, 89.999999, 90.0, 151.2093, 179.999999,
    ];

    for value in samples {
        let (deg, min, sec) = coordinate::to_dms(value);
        assert!((0..60).contains(&min), "minutes out of range for {value}");
        assert!((0.0..60.000001).contains(&sec), "seconds out of range for {value}");

        let rebuilt = coordinate::from_dms(f64::from(deg), f64::from(min), sec);
        assert!(
            (rebuilt - value).abs() < 1e-6,
            "round trip drifted for {value}: got {rebuilt}"
        );
    }
}

#[test]
fn altitude_validator_covers_range() {
    assert!(coordinate::is_valid_altitude("0"));
    assert!(coordinate::is_valid_altitude("-1000"));
    assert!(coordinate::is_valid_altitude("8888"));
    assert!(coordinate::is_valid_altitude("  123.5  "));
    assert!(!coordinate::is_valid_altitude("-1000.1"));
    assert!(!coordinate::is_valid_altitude("8888.5"));
    assert!(!coordinate::is_valid_altitude("high"));
    assert!(!coordinate::is_valid_altitude(""));
}

#[test]
fn direction_validator_covers_range() {
    assert!(coordinate::is_valid_direction("0"));
    assert!(coordinate::is_valid_direction("-360"));
    assert!(coordinate::is_valid_direction("360"));
    assert!(coordinate::is_valid_direction("181.25"));
    assert!(!coordinate::is_valid_direction("360.5"));
    assert!(!coordinate::is_valid_direction("north"));
}
