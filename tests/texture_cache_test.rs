use std::{io::Cursor, sync::Arc};

use flow_preview::{
    config::Settings,
    data_structures::{
        guid::Guid,
        texture::{PixelFormat, PixelType, Texture, TextureInfo},
    },
    resources::{
        decode::{SwizzleChannelFixer, channel_order},
        texture::{ColorLayout, RawMip, SourcePixelFormat, TextureSource},
    },
    texture_cache::{PixelLayout, TextureCache, pixel_layout},
};

use crate::common::test_utils::{CountingDecoder, FakeSource};

mod common;

fn cache_with(settings: &Settings) -> (TextureCache, Arc<CountingDecoder>) {
    let decoder = Arc::new(CountingDecoder::new());
    (TextureCache::from_settings(settings, decoder.clone()), decoder)
}

fn cache() -> (TextureCache, Arc<CountingDecoder>) {
    cache_with(&Settings::default())
}

#[test]
fn decodes_each_source_at_most_once() {
    let (mut cache, decoder) = cache();
    let source = FakeSource::rgba(Guid::new(), 4, 4, [1, 2, 3, 4]);

    let first = cache.get_or_decode(&source, false).expect("first decode");
    let second = cache.get_or_decode(&source, false).expect("cached texture");

    assert_eq!(decoder.decodes(), 1);
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(cache.len(), 1);
    assert_eq!((first.width, first.height), (4, 4));
    assert_eq!(first.format, PixelFormat::Rgba);
    assert_eq!(first.byte_len(), 4 * 4 * 4);
}

#[test]
fn source_without_data_is_absent_without_decoding() {
    let (mut cache, decoder) = cache();
    let source = FakeSource::empty(Guid::new());

    assert!(cache.get_or_decode(&source, false).is_none());
    assert_eq!(decoder.total(), 0);
    assert!(cache.is_empty());
}

#[test]
fn mips_above_the_preview_size_are_not_requested() {
    let settings = Settings {
        preview_max_texture_size: 2,
        ..Default::default()
    };
    let (mut cache, decoder) = cache_with(&settings);
    let source = FakeSource::rgba(Guid::new(), 4, 4, [0; 4]);

    assert!(cache.get_or_decode(&source, false).is_none());
    assert_eq!(decoder.total(), 0);
}

#[test]
fn decode_failures_are_absence_and_not_cached() {
    let decoder = Arc::new(CountingDecoder::failing());
    let mut cache = TextureCache::from_settings(&Settings::default(), decoder.clone());
    let source = FakeSource::rgba(Guid::new(), 2, 2, [0; 4]);

    assert!(cache.get_or_decode(&source, false).is_none());
    assert!(cache.get_or_decode(&source, false).is_none());
    assert_eq!(decoder.decodes(), 2);
    assert!(!cache.contains(source.lighting_guid()));
}

#[test]
fn block_compressed_mips_are_reported_missing() {
    let (mut cache, decoder) = cache();
    let source = FakeSource::with_mip(
        Guid::new(),
        SourcePixelFormat::Bc7,
        RawMip {
            width: 4,
            height: 4,
            data: vec![0; 16],
        },
    );

    assert!(cache.get_or_decode(&source, false).is_none());
    assert_eq!(decoder.decodes(), 1);
}

#[test]
fn bgra_mips_are_swizzled_to_rgba() {
    let (mut cache, _) = cache();
    let source = FakeSource::with_mip(
        Guid::new(),
        SourcePixelFormat::B8G8R8A8,
        RawMip {
            width: 1,
            height: 1,
            data: vec![10, 20, 30, 40],
        },
    );

    let texture = cache.get_or_decode(&source, false).expect("texture");
    assert_eq!(*texture.pixels(), vec![30, 20, 10, 40]);
}

#[test]
fn encoded_mips_go_through_the_image_decoder() {
    let image = image::RgbaImage::from_pixel(3, 2, image::Rgba([9, 8, 7, 255]));
    let mut png = Cursor::new(Vec::new());
    image
        .write_to(&mut png, image::ImageFormat::Png)
        .expect("encode png");

    let (mut cache, _) = cache();
    let source = FakeSource::with_mip(
        Guid::new(),
        SourcePixelFormat::Encoded,
        RawMip {
            width: 3,
            height: 2,
            data: png.into_inner(),
        },
    );

    let texture = cache.get_or_decode(&source, false).expect("texture");
    assert_eq!((texture.width, texture.height), (3, 2));
    assert_eq!(&texture.pixels()[..4], &[9, 8, 7, 255]);
}

#[test]
fn normal_maps_get_their_blue_channel_back() {
    let (mut cache, _) = cache();
    // a flat normal (0, 0, 1) stored in two channels
    let source = FakeSource::with_mip(
        Guid::new(),
        SourcePixelFormat::R8G8,
        RawMip {
            width: 1,
            height: 1,
            data: vec![128, 128],
        },
    )
    .normal_map();

    let texture = cache.get_or_decode(&source, false).expect("texture");
    let pixels = texture.pixels();
    assert_eq!(&pixels[..2], &[128, 128]);
    assert!(pixels[2] >= 254, "blue was {}", pixels[2]);
}

#[test]
fn virtual_textures_take_their_layout_from_the_bitmap() {
    let cases = [
        (ColorLayout::Bgra8888, PixelFormat::Bgra, PixelType::UnsignedByte, 4),
        (ColorLayout::Rgb565, PixelFormat::Rgb, PixelType::UnsignedShort565, 2),
        (ColorLayout::Gray8, PixelFormat::Luminance, PixelType::UnsignedByte, 1),
        (ColorLayout::Rgb888x, PixelFormat::Rgb, PixelType::UnsignedByte, 3),
        (ColorLayout::Rgba8888, PixelFormat::Rgba, PixelType::UnsignedByte, 4),
    ];

    for (layout, format, pixel_type, stride) in cases {
        let (mut cache, decoder) = cache();
        let source = FakeSource::virtual_texture(Guid::new(), layout, 7);

        let texture = cache.get_or_decode(&source, false).expect("virtual texture");
        assert_eq!(decoder.virtual_decodes(), 1);
        assert_eq!(decoder.decodes(), 0);
        assert_eq!(texture.format, format, "{:?}", layout);
        assert_eq!(texture.pixel_type, pixel_type, "{:?}", layout);
        assert_eq!(texture.stride(), stride, "{:?}", layout);
        assert_eq!(texture.byte_len(), 2 * 2 * stride, "{:?}", layout);
    }
}

#[test]
fn pixel_layout_table() {
    assert_eq!(pixel_layout(ColorLayout::Rgb888x).format, PixelFormat::Rgb);
    assert_eq!(
        pixel_layout(ColorLayout::Rgb565),
        PixelLayout {
            format: PixelFormat::Rgb,
            pixel_type: PixelType::UnsignedShort565,
        }
    );
    assert_eq!(pixel_layout(ColorLayout::Bgra8888).format, PixelFormat::Bgra);
    assert_eq!(pixel_layout(ColorLayout::Gray8).format, PixelFormat::Luminance);
    for layout in [
        ColorLayout::Rgba8888,
        ColorLayout::Alpha8,
        ColorLayout::Argb4444,
        ColorLayout::RgbaF16,
    ] {
        assert_eq!(pixel_layout(layout), PixelLayout::RGBA8, "{:?}", layout);
    }
}

#[test]
fn channel_fix_follows_the_configured_game() {
    let settings = Settings {
        game_name: "hk_project".to_string(),
        ..Default::default()
    };
    let (mut cache, _) = cache_with(&settings);
    assert_eq!(cache.options().game, "HK_PROJECT");

    let fixed = FakeSource::rgba(Guid::new(), 1, 1, [10, 20, 30, 40]);
    let untouched = FakeSource::rgba(Guid::new(), 1, 1, [10, 20, 30, 40]);

    let fixed = cache.get_or_decode(&fixed, true).expect("fixed");
    let untouched = cache.get_or_decode(&untouched, false).expect("untouched");

    assert_eq!(*fixed.pixels(), vec![30, 10, 20, 40]);
    assert_eq!(*untouched.pixels(), vec![10, 20, 30, 40]);
}

#[test]
fn channel_fix_skips_unknown_games_and_non_rgba_textures() {
    assert_eq!(channel_order("FORTNITEGAME"), None);
    assert_eq!(channel_order("CCFF7R"), Some([2, 1, 0, 3]));

    let settings = Settings {
        game_name: "ccff7r".to_string(),
        ..Default::default()
    };
    let decoder = Arc::new(CountingDecoder::new());
    let mut cache = TextureCache::from_settings(&settings, decoder)
        .with_channel_fixer(Arc::new(SwizzleChannelFixer));
    let source = FakeSource::virtual_texture(Guid::new(), ColorLayout::Bgra8888, 5);

    let texture = cache.get_or_decode(&source, true).expect("texture");
    assert_eq!(*texture.pixels(), vec![5; 16]);
}

#[test]
fn adopt_keeps_the_first_texture_per_id() {
    let (mut cache, _) = cache();
    let guid = Guid::new();
    let info = TextureInfo {
        guid,
        name: "T_Adopted".to_string(),
    };
    let first = Arc::new(Texture::new(vec![1; 4], 1, 1, info.clone()));
    let second = Arc::new(Texture::new(vec![2; 4], 1, 1, info));

    let kept = cache.adopt(first.clone());
    let rejected = cache.adopt(second);

    assert!(Arc::ptr_eq(&kept, &first));
    assert!(Arc::ptr_eq(&rejected, &first));
    assert_eq!(cache.len(), 1);
    assert!(cache.try_get(guid).is_some());
}

#[test]
fn dispose_all_releases_buffers_and_is_idempotent() {
    let (mut cache, _) = cache();
    let held = cache
        .get_or_decode(&FakeSource::rgba(Guid::new(), 2, 2, [1; 4]), false)
        .expect("texture");
    cache
        .get_or_decode(&FakeSource::rgba(Guid::new(), 2, 2, [2; 4]), false)
        .expect("texture");

    cache.dispose_all();
    assert!(cache.is_empty());
    assert!(held.is_disposed());
    assert_eq!(held.byte_len(), 0);

    cache.dispose_all();
    assert!(cache.is_empty());
}
