//! Upload intake tests: validation, cleanup and metadata backfill

mod helpers;

use axum::body::Bytes;
use helpers::{image_bytes, sized_image_bytes, tagged_wav_bytes, wav_bytes, AudioConfig, TestApp};
use image::ImageFormat;
use std::time::Duration;
use tunehub_api::services::{IntakeError, UploadRequest, UploadedFile};
use tunehub_common::config::UploadConfig;

fn file(name: &str, data: Vec<u8>) -> UploadedFile {
    UploadedFile {
        filename: Some(name.to_string()),
        bytes: Bytes::from(data),
    }
}

fn request(audio: UploadedFile, artwork: Option<UploadedFile>) -> UploadRequest {
    UploadRequest {
        audio,
        artwork,
        title: None,
        artist: None,
        album: None,
        uploaded_by: 1,
    }
}

#[tokio::test]
async fn test_disallowed_audio_extension_writes_nothing() {
    let app = TestApp::new().await;

    for (name, artwork) in [
        ("notes.txt", None),
        ("song.exe", Some(file("cover.png", image_bytes(ImageFormat::Png)))),
        ("noextension", None),
    ] {
        let result = app
            .state
            .intake
            .ingest(request(file(name, wav_bytes(&AudioConfig::default())), artwork))
            .await;
        assert!(
            matches!(result, Err(IntakeError::UnsupportedAudioFormat(_))),
            "{}: {:?}",
            name,
            result
        );
    }

    assert_eq!(app.blob_count("audio"), 0);
    assert_eq!(app.blob_count("artwork"), 0);
    assert_eq!(app.track_count().await, 0);
}

#[tokio::test]
async fn test_missing_filename_rejected() {
    let app = TestApp::new().await;
    let audio = UploadedFile {
        filename: None,
        bytes: Bytes::from(wav_bytes(&AudioConfig::default())),
    };

    let result = app.state.intake.ingest(request(audio, None)).await;
    assert!(matches!(result, Err(IntakeError::MissingFilename)));
    assert_eq!(app.track_count().await, 0);
}

#[tokio::test]
async fn test_oversized_payloads_rejected_before_write() {
    let app = TestApp::with_limits(UploadConfig {
        max_audio_bytes: 1024,
        max_artwork_bytes: 16,
    })
    .await;

    let result = app
        .state
        .intake
        .ingest(request(file("big.wav", vec![0u8; 2048]), None))
        .await;
    assert!(matches!(
        result,
        Err(IntakeError::AudioTooLarge {
            size: 2048,
            limit: 1024
        })
    ));

    let result = app
        .state
        .intake
        .ingest(request(
            file("small.wav", vec![0u8; 512]),
            Some(file("cover.png", image_bytes(ImageFormat::Png))),
        ))
        .await;
    assert!(matches!(result, Err(IntakeError::ArtworkTooLarge { .. })));

    assert_eq!(app.blob_count("audio"), 0);
    assert_eq!(app.track_count().await, 0);
}

#[tokio::test]
async fn test_disallowed_artwork_extension_writes_nothing() {
    let app = TestApp::new().await;

    let result = app
        .state
        .intake
        .ingest(request(
            file("song.wav", wav_bytes(&AudioConfig::default())),
            Some(file("cover.bmp", vec![1, 2, 3])),
        ))
        .await;

    assert!(matches!(result, Err(IntakeError::UnsupportedImageFormat(_))));
    assert_eq!(app.blob_count("audio"), 0);
    assert_eq!(app.track_count().await, 0);
}

#[tokio::test]
async fn test_corrupt_artwork_removes_stored_audio() {
    let app = TestApp::new().await;

    let result = app
        .state
        .intake
        .ingest(request(
            file("song.wav", wav_bytes(&AudioConfig::default())),
            Some(file("cover.png", b"not really a png".to_vec())),
        ))
        .await;

    assert!(matches!(result, Err(IntakeError::InvalidImage(_))), "{:?}", result);
    assert_eq!(app.blob_count("audio"), 0);
    assert_eq!(app.blob_count("artwork"), 0);
    assert_eq!(app.track_count().await, 0);
}

#[tokio::test]
async fn test_bmp_content_behind_png_extension_is_rejected() {
    let app = TestApp::new().await;

    let result = app
        .state
        .intake
        .ingest(request(
            file("song.wav", wav_bytes(&AudioConfig::default())),
            Some(file("cover.png", image_bytes(ImageFormat::Bmp))),
        ))
        .await;

    assert!(matches!(result, Err(IntakeError::InvalidImage(_))), "{:?}", result);
    assert_eq!(app.blob_count("audio"), 0);
    assert_eq!(app.blob_count("artwork"), 0);
    assert_eq!(app.track_count().await, 0);
}

#[tokio::test]
async fn test_dropped_upload_still_completes_without_orphans() {
    let app = TestApp::new().await;
    let upload = app.state.intake.ingest(request(
        file("song.wav", wav_bytes(&AudioConfig::default())),
        Some(file("cover.png", sized_image_bytes(ImageFormat::Png, 2000, 2000))),
    ));

    // the caller goes away while the artwork is still being normalised
    let _ = tokio::time::timeout(Duration::from_millis(20), upload).await;

    for _ in 0..600 {
        if app.track_count().await == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    assert_eq!(app.track_count().await, 1);
    assert_eq!(app.blob_count("audio"), 1);
    assert_eq!(app.blob_count("artwork"), 1);
}

#[tokio::test]
async fn test_failed_insert_removes_all_blobs() {
    let app = TestApp::new().await;
    sqlx::query("DROP TABLE tracks")
        .execute(&app.state.db)
        .await
        .unwrap();

    let result = app
        .state
        .intake
        .ingest(request(
            file("song.wav", wav_bytes(&AudioConfig::default())),
            Some(file("cover.png", image_bytes(ImageFormat::Png))),
        ))
        .await;

    assert!(matches!(result, Err(IntakeError::Database(_))), "{:?}", result);
    assert_eq!(app.blob_count("audio"), 0);
    assert_eq!(app.blob_count("artwork"), 0);
}

#[tokio::test]
async fn test_embedded_tags_fill_missing_fields() {
    let app = TestApp::new().await;
    let audio = file(
        "upload.wav",
        tagged_wav_bytes(&AudioConfig::default(), "T", "A"),
    );

    let track = app.state.intake.ingest(request(audio, None)).await.unwrap();

    assert_eq!(track.title, "T");
    assert_eq!(track.artist, "A");
    assert_eq!(track.album, "Unknown Album");
    assert!(track.audio_path.starts_with("audio/"));
    assert!(track.audio_path.ends_with(".wav"));
    assert!(track.analysis.is_pending());
}

#[tokio::test]
async fn test_overrides_win_and_blank_overrides_are_ignored() {
    let app = TestApp::new().await;
    let mut req = request(
        file("upload.wav", tagged_wav_bytes(&AudioConfig::default(), "T", "A")),
        None,
    );
    req.title = Some("Custom Title".to_string());
    req.artist = Some("   ".to_string());
    req.album = Some("Custom Album".to_string());

    let track = app.state.intake.ingest(req).await.unwrap();

    assert_eq!(track.title, "Custom Title");
    assert_eq!(track.artist, "A");
    assert_eq!(track.album, "Custom Album");
}

#[tokio::test]
async fn test_untagged_upload_uses_filename_and_placeholders() {
    let app = TestApp::new().await;

    let track = app
        .state
        .intake
        .ingest(request(
            file("My Demo.WAV", wav_bytes(&AudioConfig::default())),
            None,
        ))
        .await
        .unwrap();

    assert_eq!(track.title, "My Demo");
    assert_eq!(track.artist, "Unknown Artist");
    assert_eq!(track.album, "Unknown Album");
    assert_eq!(track.sample_rate, Some(22050));
    assert!(track.duration.is_some());
    // lowercased extension kept for decoder hints
    assert!(track.audio_path.ends_with(".wav"));
}

#[tokio::test]
async fn test_artwork_stored_as_square_jpeg() {
    let app = TestApp::new().await;

    for (format, name) in [
        (ImageFormat::Png, "cover.png"),
        (ImageFormat::Gif, "cover.gif"),
        (ImageFormat::WebP, "cover.webp"),
        (ImageFormat::Jpeg, "cover.jpg"),
    ] {
        let track = app
            .state
            .intake
            .ingest(request(
                file("song.wav", wav_bytes(&AudioConfig::default())),
                Some(file(name, image_bytes(format))),
            ))
            .await
            .unwrap();

        let artwork_path = track.artwork_path.expect("artwork stored");
        assert!(artwork_path.starts_with("artwork/") && artwork_path.ends_with(".jpg"));

        let stored = std::fs::read(app.content_root().join(&artwork_path)).unwrap();
        assert_eq!(image::guess_format(&stored).unwrap(), ImageFormat::Jpeg, "{}", name);
        let decoded = image::load_from_memory(&stored).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (500, 500), "{}", name);
    }

    assert_eq!(app.track_count().await, 4);
}
