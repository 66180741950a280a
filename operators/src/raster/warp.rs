use gdal::Dataset;
use gdal_sys::{CPLErr, GDALResampleAlg};
use geoutils_datatypes::util::gdal::ResamplingMethod;
use std::ffi::{CStr, c_double, c_int, c_void};

use crate::error::Error;
use crate::util::Result;
use crate::util::gdal::{GdalNumThreads, name_value_list};

/// The parameters of a single band warp.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WarpParameters {
    pub resampling_method: ResamplingMethod,
    pub num_threads: GdalNumThreads,
    pub source_no_data: Option<f64>,
    pub destination_no_data: f64,
}

pub fn gdal_resample_alg(resampling_method: ResamplingMethod) -> GDALResampleAlg::Type {
    match resampling_method {
        ResamplingMethod::Nearest => GDALResampleAlg::GRA_NearestNeighbour,
        ResamplingMethod::Bilinear => GDALResampleAlg::GRA_Bilinear,
        ResamplingMethod::Cubic => GDALResampleAlg::GRA_Cubic,
        ResamplingMethod::Lanczos => GDALResampleAlg::GRA_Lanczos,
    }
}

fn last_error(method_name: &'static str) -> Error {
    let msg = unsafe {
        let msg = CStr::from_ptr(gdal_sys::CPLGetLastErrorMsg())
            .to_string_lossy()
            .into_owned();
        gdal_sys::CPLErrorReset();
        msg
    };

    Error::Warp { method_name, msg }
}

struct WarpOptions(*mut gdal_sys::GDALWarpOptions);

impl Drop for WarpOptions {
    fn drop(&mut self) {
        // frees band lists, no data arrays and the warp option list as well
        unsafe { gdal_sys::GDALDestroyWarpOptions(self.0) };
    }
}

struct Transformer(*mut c_void);

impl Drop for Transformer {
    fn drop(&mut self) {
        unsafe { gdal_sys::GDALDestroyGenImgProjTransformer(self.0) };
    }
}

struct WarpOperation(gdal_sys::GDALWarpOperationH);

impl Drop for WarpOperation {
    fn drop(&mut self) {
        unsafe { gdal_sys::GDALDestroyWarpOperation(self.0) };
    }
}

/// Allocates a single-element array with GDAL's allocator so that GDAL can free it.
unsafe fn cpl_single<T>(value: T) -> *mut T {
    unsafe {
        let ptr = gdal_sys::CPLMalloc(std::mem::size_of::<T>()).cast::<T>();
        ptr.write(value);
        ptr
    }
}

/// Resamples `source_band` of `source` into `destination_band` of `destination`.
///
/// Both datasets must carry a geotransform and a spatial reference. The whole destination
/// raster is filled; pixels without source data get `destination_no_data`.
///
pub fn warp_band(
    source: &Dataset,
    source_band: usize,
    destination: &Dataset,
    destination_band: usize,
    parameters: &WarpParameters,
) -> Result<()> {
    let (width, height) = destination.raster_size();

    let warp_option_list = name_value_list([
        ("NUM_THREADS", parameters.num_threads.to_string()),
        ("INIT_DEST", "NO_DATA".to_string()),
    ])?;

    // the guards are dropped in reverse order: operation, options, transformer
    unsafe {
        let transformer = Transformer(gdal_sys::GDALCreateGenImgProjTransformer(
            source.c_dataset(),
            std::ptr::null(),
            destination.c_dataset(),
            std::ptr::null(),
            0,
            0.0,
            0,
        ));
        if transformer.0.is_null() {
            return Err(last_error("GDALCreateGenImgProjTransformer"));
        }

        let options = WarpOptions(gdal_sys::GDALCreateWarpOptions());
        let raw = &mut *options.0;

        raw.hSrcDS = source.c_dataset();
        raw.hDstDS = destination.c_dataset();
        raw.papszWarpOptions = gdal_sys::CSLDuplicate(warp_option_list.as_ptr());
        raw.eResampleAlg = gdal_resample_alg(parameters.resampling_method);

        raw.nBandCount = 1;
        raw.panSrcBands = cpl_single(source_band as c_int);
        raw.panDstBands = cpl_single(destination_band as c_int);

        if let Some(source_no_data) = parameters.source_no_data {
            raw.padfSrcNoDataReal = cpl_single(source_no_data as c_double);
        }
        raw.padfDstNoDataReal = cpl_single(parameters.destination_no_data as c_double);

        raw.pfnTransformer = Some(gdal_sys::GDALGenImgProjTransform);
        raw.pTransformerArg = transformer.0;

        let operation = WarpOperation(gdal_sys::GDALCreateWarpOperation(options.0));
        if operation.0.is_null() {
            return Err(last_error("GDALCreateWarpOperation"));
        }

        let result = gdal_sys::GDALChunkAndWarpImage(
            operation.0,
            0,
            0,
            width as c_int,
            height as c_int,
        );
        if result != CPLErr::CE_None {
            return Err(last_error("GDALChunkAndWarpImage"));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use gdal::DriverManager;
    use gdal::spatial_ref::SpatialRef;

    fn mem_raster(
        geo_transform: [f64; 6],
        width: usize,
        height: usize,
        values: Vec<f32>,
        no_data: Option<f64>,
    ) -> Dataset {
        let driver = DriverManager::get_driver_by_name("MEM").unwrap();
        let mut dataset = driver
            .create_with_band_type::<f32, _>("", width, height, 1)
            .unwrap();
        dataset.set_geo_transform(&geo_transform).unwrap();
        dataset
            .set_projection(&SpatialRef::from_epsg(3857).unwrap().to_wkt().unwrap())
            .unwrap();

        {
            let mut band = dataset.rasterband(1).unwrap();
            band.set_no_data_value(no_data).unwrap();
            let mut buffer = gdal::raster::Buffer::new((width, height), values);
            band.write((0, 0), (width, height), &mut buffer).unwrap();
        }

        dataset
    }

    fn read(dataset: &Dataset) -> Vec<f32> {
        let size = dataset.raster_size();
        dataset
            .rasterband(1)
            .unwrap()
            .read_as::<f32>((0, 0), size, size, None)
            .unwrap()
            .data()
            .to_vec()
    }

    #[test]
    fn it_maps_resampling_methods() {
        assert_eq!(
            gdal_resample_alg(ResamplingMethod::Nearest),
            GDALResampleAlg::GRA_NearestNeighbour
        );
        assert_eq!(
            gdal_resample_alg(ResamplingMethod::Lanczos),
            GDALResampleAlg::GRA_Lanczos
        );
    }

    #[test]
    fn identical_grids_copy_values() {
        let geo_transform = [0.0, 10.0, 0.0, 40.0, 0.0, -10.0];
        let values: Vec<f32> = (0..16).map(|v| v as f32).collect();

        let source = mem_raster(geo_transform, 4, 4, values.clone(), None);
        let destination = mem_raster(geo_transform, 4, 4, vec![0.0; 16], Some(-9999.0));

        warp_band(
            &source,
            1,
            &destination,
            1,
            &WarpParameters {
                resampling_method: ResamplingMethod::Nearest,
                num_threads: GdalNumThreads::NumThreads(1),
                source_no_data: None,
                destination_no_data: -9999.0,
            },
        )
        .unwrap();

        assert_eq!(read(&destination), values);
    }

    #[test]
    fn uncovered_pixels_get_no_data() {
        let source = mem_raster(
            [0.0, 10.0, 0.0, 40.0, 0.0, -10.0],
            2,
            4,
            vec![5.0; 8],
            None,
        );
        let destination = mem_raster(
            [0.0, 10.0, 0.0, 40.0, 0.0, -10.0],
            4,
            4,
            vec![0.0; 16],
            Some(-9999.0),
        );

        warp_band(
            &source,
            1,
            &destination,
            1,
            &WarpParameters {
                resampling_method: ResamplingMethod::Nearest,
                num_threads: GdalNumThreads::AllCpus,
                source_no_data: None,
                destination_no_data: -9999.0,
            },
        )
        .unwrap();

        let values = read(&destination);
        for row in 0..4 {
            assert_eq!(&values[row * 4..row * 4 + 2], &[5.0, 5.0]);
            assert_eq!(&values[row * 4 + 2..row * 4 + 4], &[-9999.0, -9999.0]);
        }
    }
}
