//! 送信前の画像前処理
//!
//! 固定数のワーカーが共有カーソルから1件ずつ取り出して処理する。
//! 完了順に関わらず結果は入力順で返す。1件でも失敗すれば全体が失敗する。

mod downscale;

pub use downscale::{downscale_bytes, target_size, DownscaleOptions, PreparedImage};

use crate::error::{InspectError, Result};
use crate::scanner::ImageInfo;
use futures::future::try_join_all;
use indicatif::{ProgressBar, ProgressStyle};
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Instant;

/// 前処理の設定
#[derive(Debug, Clone, Copy)]
pub struct PreprocessOptions {
    pub compress: bool,
    pub downscale: DownscaleOptions,
    pub concurrency: usize,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

async fn drain<T, R, E, F, Fut>(
    cursor: &AtomicUsize,
    pending: &Mutex<Vec<Option<T>>>,
    finished: &Mutex<Vec<Option<R>>>,
    worker: &F,
) -> std::result::Result<(), E>
where
    F: Fn(T, usize) -> Fut,
    Fut: Future<Output = std::result::Result<R, E>>,
{
    let total = lock(pending).len();
    loop {
        let index = cursor.fetch_add(1, Ordering::SeqCst);
        if index >= total {
            return Ok(());
        }
        let item = lock(pending)[index].take();
        if let Some(item) = item {
            let value = worker(item, index).await?;
            lock(finished)[index] = Some(value);
        }
    }
}

/// 同時実行数を制限して `worker` を全件に適用する
///
/// ワーカー数は `min(limit, items.len())`（`limit` が0なら1）。
pub async fn run_bounded<T, R, E, F, Fut>(
    items: Vec<T>,
    limit: usize,
    worker: F,
) -> std::result::Result<Vec<R>, E>
where
    F: Fn(T, usize) -> Fut,
    Fut: Future<Output = std::result::Result<R, E>>,
{
    let total = items.len();
    let runners = limit.max(1).min(total);

    let cursor = AtomicUsize::new(0);
    let pending = Mutex::new(items.into_iter().map(Some).collect::<Vec<_>>());
    let finished = Mutex::new((0..total).map(|_| None).collect::<Vec<Option<R>>>());

    try_join_all((0..runners).map(|_| drain(&cursor, &pending, &finished, &worker))).await?;

    let results = finished.into_inner().unwrap_or_else(PoisonError::into_inner);
    Ok(results.into_iter().flatten().collect())
}

/// 画像1枚を読み込み、必要なら縮小する
pub async fn prepare_image(image: ImageInfo, options: PreprocessOptions) -> Result<PreparedImage> {
    let bytes = tokio::fs::read(&image.path).await?;

    if !options.compress {
        return Ok(PreparedImage {
            mime_type: image.mime_type(),
            file_name: image.file_name,
            bytes,
        });
    }

    let file_name = image.file_name;
    let downscale = options.downscale;
    tokio::task::spawn_blocking(move || downscale_bytes(&bytes, &file_name, downscale))
        .await
        .map_err(|e| InspectError::Preprocess(e.to_string()))?
}

/// 全画像を前処理する（結果は入力順）
pub async fn prepare_all(images: &[ImageInfo], options: PreprocessOptions) -> Result<Vec<PreparedImage>> {
    let started = Instant::now();

    let progress = ProgressBar::new(images.len() as u64);
    if let Ok(style) = ProgressStyle::with_template("  {bar:30} {pos}/{len} {msg}") {
        progress.set_style(style);
    }

    let prepared = run_bounded(images.to_vec(), options.concurrency, |image, index| {
        let progress = progress.clone();
        async move {
            tracing::debug!(index, file = %image.file_name, "前処理開始");
            let result = prepare_image(image, options).await;
            progress.inc(1);
            result
        }
    })
    .await;
    progress.finish_and_clear();

    let prepared = prepared?;
    let total_bytes: usize = prepared.iter().map(|p| p.bytes.len()).sum();
    tracing::info!(
        files = prepared.len(),
        total_bytes,
        compress = options.compress,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "前処理完了"
    );

    Ok(prepared)
}
