use log::LevelFilter;
use simplelog::{Config, TestLogger};
use std::io::Cursor;
use std::sync::Once;


static START: Once = Once::new();

fn init_logger_for_test() {
    START.call_once(|| TestLogger::init(LevelFilter::Trace, Config::default()).unwrap());
}

pub fn init() {
    init_logger_for_test();
}

pub fn png_bytes(img: &image::RgbaImage) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageOutputFormat::Png).unwrap();
    out.into_inner()
}

pub fn solid_png(rgb: [u8; 3]) -> Vec<u8> {
    png_bytes(&image::RgbaImage::from_pixel(8, 8, image::Rgba([rgb[0], rgb[1], rgb[2], 255])))
}
