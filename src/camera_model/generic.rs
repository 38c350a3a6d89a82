use camera_intrinsic_model::GenericModel;
use image::GrayImage;
use nalgebra as na;
use rayon::prelude::*;

/// Bilinear lookup of `src` through per-pixel source coordinates.
///
/// `map0`/`map1` hold the x/y source coordinate for every output pixel
/// (rows = output height). NaN or out-of-image entries produce black.
pub fn remap(src: &GrayImage, map0: &na::DMatrix<f32>, map1: &na::DMatrix<f32>) -> GrayImage {
    let (r, c) = map0.shape();
    let (w, h) = (src.width() as f32, src.height() as f32);
    GrayImage::from_par_fn(c as u32, r as u32, |x, y| {
        let x_cor = map0[(y as usize, x as usize)];
        let y_cor = map1[(y as usize, x as usize)];
        if x_cor.is_nan() || y_cor.is_nan() {
            return image::Luma([0]);
        }
        if x_cor < 0.0 || y_cor < 0.0 || x_cor > w - 1.0 || y_cor > h - 1.0 {
            return image::Luma([0]);
        }
        let x0 = x_cor.floor() as u32;
        let y0 = y_cor.floor() as u32;
        let x1 = (x0 + 1).min(src.width() - 1);
        let y1 = (y0 + 1).min(src.height() - 1);
        let ax = x_cor - x0 as f32;
        let ay = y_cor - y0 as f32;
        let p = |xx: u32, yy: u32| src.get_pixel(xx, yy)[0] as f32;
        let top = p(x0, y0) * (1.0 - ax) + p(x1, y0) * ax;
        let bottom = p(x0, y1) * (1.0 - ax) + p(x1, y1) * ax;
        let v = top * (1.0 - ay) + bottom * ay;
        image::Luma([v.round().clamp(0.0, 255.0) as u8])
    })
}

/// Builds the lookup maps that undistort an image taken by `camera_model`
/// into a pinhole image with camera matrix `projection_mat`.
pub fn init_undistort_map(
    camera_model: &GenericModel<f64>,
    projection_mat: &na::Matrix3<f64>,
    new_w_h: (u32, u32),
) -> (na::DMatrix<f32>, na::DMatrix<f32>) {
    let fx = projection_mat[(0, 0)];
    let fy = projection_mat[(1, 1)];
    let cx = projection_mat[(0, 2)];
    let cy = projection_mat[(1, 2)];
    let (xvec, yvec): (Vec<f32>, Vec<f32>) = (0..new_w_h.1)
        .into_par_iter()
        .flat_map_iter(|y| {
            (0..new_w_h.0).map(move |x| {
                na::Vector3::new((x as f64 - cx) / fx, (y as f64 - cy) / fy, 1.0)
            })
        })
        .map(|ray| {
            let xy = camera_model.project_one(&ray);
            if xy[0].is_finite() && xy[1].is_finite() {
                (xy[0] as f32, xy[1] as f32)
            } else {
                (f32::NAN, f32::NAN)
            }
        })
        .unzip();
    let h = new_w_h.1 as usize;
    let w = new_w_h.0 as usize;
    let xmap = na::DMatrix::from_row_slice(h, w, &xvec);
    let ymap = na::DMatrix::from_row_slice(h, w, &yvec);
    (xmap, ymap)
}
