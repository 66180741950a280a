use super::RasterDataType;
use crate::error::{self, Error};

/// Decides which no data value an output band gets.
///
/// Precedence: a declared value wins unconditionally (even `NaN`), then the caller's
/// fallback, then the default of the data type.
///
/// # Errors
///
/// Fails with [`Error::UnsupportedDatatype`] if neither a declared nor a fallback value
/// is present and the data type has no default (64 bit integers).
///
pub fn resolve_no_data(
    data_type: RasterDataType,
    declared: Option<f64>,
    fallback: Option<f64>,
) -> Result<f64, Error> {
    if let Some(declared) = declared {
        return Ok(declared);
    }

    if let Some(fallback) = fallback {
        return Ok(fallback);
    }

    data_type
        .default_no_data_value()
        .ok_or_else(|| error::Error::UnsupportedDatatype {
            data_type: data_type.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    #[allow(clippy::float_cmp)]
    fn declared_wins_over_fallback() {
        for data_type in RasterDataType::iter() {
            assert_eq!(
                resolve_no_data(data_type, Some(0.0), Some(9999.0)).unwrap(),
                0.0
            );
        }
    }

    #[test]
    fn declared_nan_is_kept() {
        let no_data = resolve_no_data(RasterDataType::F32, Some(f64::NAN), Some(1.0)).unwrap();
        assert!(no_data.is_nan());
    }

    #[test]
    #[allow(clippy::float_cmp)]
    fn fallback_wins_over_default() {
        assert_eq!(
            resolve_no_data(RasterDataType::U16, None, Some(9999.0)).unwrap(),
            9999.0
        );
        assert_eq!(
            resolve_no_data(RasterDataType::I64, None, Some(-1.0)).unwrap(),
            -1.0
        );
    }

    #[test]
    #[allow(clippy::float_cmp)]
    fn datatype_defaults() {
        let expected = [
            (RasterDataType::I8, -128.0),
            (RasterDataType::U8, 255.0),
            (RasterDataType::I16, -32768.0),
            (RasterDataType::U16, 65535.0),
            (RasterDataType::I32, -2_147_483_648.0),
            (RasterDataType::U32, 4_294_967_295.0),
            (RasterDataType::F32, -9999.0),
            (RasterDataType::F64, -9999.0),
        ];

        for (data_type, no_data) in expected {
            assert_eq!(resolve_no_data(data_type, None, None).unwrap(), no_data);
        }
    }

    #[test]
    fn unsupported_without_fallback() {
        for data_type in [RasterDataType::I64, RasterDataType::U64] {
            assert!(matches!(
                resolve_no_data(data_type, None, None),
                Err(Error::UnsupportedDatatype { .. })
            ));
        }
    }
}
