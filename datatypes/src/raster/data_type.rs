use crate::error::{self, Error};
use gdal::raster::{GdalDataType, GdalType};
use num_traits::AsPrimitive;
use serde::{Deserialize, Serialize};
use std::convert::TryFrom;
use strum::{EnumIter, EnumString};

/// A collection of required traits for a pixel type
pub trait Pixel:
    'static + Copy + std::fmt::Debug + Sync + Send + PartialOrd + GdalType + AsPrimitive<f64>
{
}

impl Pixel for u8 {}
impl Pixel for i8 {}
impl Pixel for u16 {}
impl Pixel for i16 {}
impl Pixel for u32 {}
impl Pixel for i32 {}
impl Pixel for u64 {}
impl Pixel for i64 {}
impl Pixel for f32 {}
impl Pixel for f64 {}

#[derive(
    Debug,
    Ord,
    PartialOrd,
    Eq,
    PartialEq,
    Hash,
    Deserialize,
    Serialize,
    Copy,
    Clone,
    EnumString,
    EnumIter,
    strum::Display,
)]
#[strum(ascii_case_insensitive)]
pub enum RasterDataType {
    #[strum(serialize = "uint8")]
    U8,
    #[strum(serialize = "uint16")]
    U16,
    #[strum(serialize = "uint32")]
    U32,
    #[strum(serialize = "uint64")]
    U64,
    #[strum(serialize = "int8")]
    I8,
    #[strum(serialize = "int16")]
    I16,
    #[strum(serialize = "int32")]
    I32,
    #[strum(serialize = "int64")]
    I64,
    #[strum(serialize = "float32")]
    F32,
    #[strum(serialize = "float64")]
    F64,
}

impl RasterDataType {
    /// Returns true if the given `value` is valid for the `RasterDataType` variant,
    /// i.e. it can be represented by a variable of the corresponding primitive data type
    #[allow(clippy::float_cmp)]
    #[allow(clippy::cast_lossless)]
    pub fn is_valid(self, value: f64) -> bool {
        match self {
            RasterDataType::U8 => value as u8 as f64 == value,
            RasterDataType::U16 => value as u16 as f64 == value,
            RasterDataType::U32 => value as u32 as f64 == value,
            RasterDataType::U64 => value as u64 as f64 == value,
            RasterDataType::I8 => value as i8 as f64 == value,
            RasterDataType::I16 => value as i16 as f64 == value,
            RasterDataType::I32 => value as i32 as f64 == value,
            RasterDataType::I64 => value as i64 as f64 == value,
            RasterDataType::F32 => value.is_nan() || value as f32 as f64 == value,
            RasterDataType::F64 => true,
        }
    }

    pub fn is_float(self) -> bool {
        matches!(self, RasterDataType::F32 | RasterDataType::F64)
    }

    pub fn is_integer(self) -> bool {
        !self.is_float()
    }

    /// The no data value that is used if a band declares none and no fallback is given.
    /// 64 bit integers have no default.
    pub fn default_no_data_value(self) -> Option<f64> {
        match self {
            RasterDataType::I8 => Some(f64::from(i8::MIN)),
            RasterDataType::U8 => Some(f64::from(u8::MAX)),
            RasterDataType::I16 => Some(f64::from(i16::MIN)),
            RasterDataType::U16 => Some(f64::from(u16::MAX)),
            RasterDataType::I32 => Some(f64::from(i32::MIN)),
            RasterDataType::U32 => Some(f64::from(u32::MAX)),
            RasterDataType::F32 | RasterDataType::F64 => Some(-9999.0),
            RasterDataType::I64 | RasterDataType::U64 => None,
        }
    }

    pub fn from_gdal_data_type(gdal_data_type: GdalDataType) -> Result<Self, Error> {
        Self::try_from(gdal_data_type)
    }
}

impl TryFrom<GdalDataType> for RasterDataType {
    type Error = Error;

    fn try_from(gdal_data_type: GdalDataType) -> Result<Self, Self::Error> {
        match gdal_data_type {
            GdalDataType::UInt8 => Ok(RasterDataType::U8),
            GdalDataType::Int8 => Ok(RasterDataType::I8),
            GdalDataType::UInt16 => Ok(RasterDataType::U16),
            GdalDataType::Int16 => Ok(RasterDataType::I16),
            GdalDataType::UInt32 => Ok(RasterDataType::U32),
            GdalDataType::Int32 => Ok(RasterDataType::I32),
            GdalDataType::UInt64 => Ok(RasterDataType::U64),
            GdalDataType::Int64 => Ok(RasterDataType::I64),
            GdalDataType::Float32 => Ok(RasterDataType::F32),
            GdalDataType::Float64 => Ok(RasterDataType::F64),
            other => Err(error::Error::UnsupportedDatatype {
                data_type: format!("{other:?}"),
            }),
        }
    }
}

/// Calls an expression with a type alias `$pixel` bound to the primitive type of a
/// `RasterDataType`.
/// Call via `call_with_pixel_type!(data_type, P => function::<P>())`.
#[macro_export]
macro_rules! call_with_pixel_type {
    ($data_type:expr, $pixel:ident => $function_call:expr) => {
        $crate::call_with_pixel_type!(
            @variants $data_type, $pixel => $function_call,
            (U8, u8), (U16, u16), (U32, u32), (U64, u64), (I8, i8),
            (I16, i16), (I32, i32), (I64, i64), (F32, f32), (F64, f64)
        )
    };

    (@variants $data_type:expr, $pixel:ident => $function_call:expr, $(($variant:ident, $primitive:ty)),+) => {
        match $data_type {
            $(
                $crate::raster::RasterDataType::$variant => {
                    type $pixel = $primitive;
                    $function_call
                }
            )+
        }
    };
}
