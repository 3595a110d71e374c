//! Codec for the compact `path` attribute: `"x1;y1 x2;y2 ..."`.

use crate::geometry::Point;

use super::error::DocumentError;

/// Parse a single coordinate. A comma decimal separator is accepted.
pub fn parse_coordinate(text: &str) -> Result<f32, DocumentError> {
    let text = text.trim();
    let value = match text.parse::<f32>() {
        Ok(v) => v,
        Err(_) => text
            .replace(',', ".")
            .parse::<f32>()
            .map_err(|_| DocumentError::coordinate(text))?,
    };
    if !value.is_finite() {
        return Err(DocumentError::coordinate(text));
    }
    Ok(value)
}

/// Parse a path string into points. An empty string yields no points.
pub fn parse_path(path: &str) -> Result<Vec<Point>, DocumentError> {
    path.split_whitespace()
        .map(|pair| {
            let mut parts = pair.split(';');
            match (parts.next(), parts.next(), parts.next()) {
                (Some(x), Some(y), None) => {
                    Ok(Point::new(parse_coordinate(x)?, parse_coordinate(y)?))
                }
                _ => Err(DocumentError::coordinate(pair)),
            }
        })
        .collect()
}

/// Format points as a path string.
pub fn format_path(points: &[Point]) -> String {
    points
        .iter()
        .map(|p| format!("{};{}", p.x, p.y))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_path() {
        let points = parse_path("10;20 30.5;40  -1;0.25").unwrap();
        assert_eq!(
            points,
            vec![
                Point::new(10.0, 20.0),
                Point::new(30.5, 40.0),
                Point::new(-1.0, 0.25)
            ]
        );
        assert!(parse_path("").unwrap().is_empty());
        assert!(parse_path("   ").unwrap().is_empty());
    }

    #[test]
    fn test_comma_decimal_separator() {
        assert_eq!(parse_coordinate("12,5").unwrap(), 12.5);
        assert_eq!(parse_path("1,5;2,25").unwrap(), vec![Point::new(1.5, 2.25)]);
    }

    #[test]
    fn test_bad_coordinates_are_errors() {
        for bad in ["abc", "1;2;3", "4", "inf;1", "NaN;2", ";"] {
            assert!(
                matches!(parse_path(bad), Err(DocumentError::CoordinateParse { .. })),
                "expected error for {bad:?}"
            );
        }
    }

    #[test]
    fn test_format_is_lossless() {
        let points = vec![Point::new(0.1, 2.0), Point::new(123.456, -7.75)];
        let text = format_path(&points);
        assert_eq!(text, "0.1;2 123.456;-7.75");
        assert_eq!(parse_path(&text).unwrap(), points);
        assert_eq!(format_path(&[]), "");
    }
}
