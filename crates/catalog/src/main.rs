//! Demo entry point: runs one create/upload/encode flow and logs what was
//! published.

use catalog::{
    Catalog, Config, CreateVideoInput, ProcessAudioVideoMediaInput, Storage,
    UploadAudioVideoMediaInput, telemetry,
};
use domain::{CastMemberId, CategoryId, GenreId, MediaKind, MediaStatus};
use unit_of_work::PgTransactionProvider;

async fn run_flow<S: Storage>(catalog: &Catalog<S>) -> catalog::Result<()> {
    // 1. Seed the related entities
    let category = CategoryId::new();
    let genre = GenreId::new();
    let cast_member = CastMemberId::new();
    catalog.categories.insert(category).await;
    catalog.genres.insert(genre).await;
    catalog.cast_members.insert(cast_member).await;

    // 2. Create the video
    let created = catalog
        .videos
        .create_video(CreateVideoInput {
            title: "Big Buck Bunny".to_string(),
            description: "A short animated film".to_string(),
            year_launched: 2024,
            duration: 92,
            category_ids: vec![category],
            genre_ids: vec![genre],
            cast_member_ids: vec![cast_member],
            ..Default::default()
        })
        .await?;

    // 3. Upload both files, then report them encoded
    let uploads = [
        (MediaKind::Video, "feature.mp4"),
        (MediaKind::Trailer, "trailer.mp4"),
    ];
    for (kind, name) in uploads {
        catalog
            .videos
            .upload_audio_video_media(UploadAudioVideoMediaInput {
                video_id: created.id,
                kind,
                name: name.to_string(),
                raw_location: format!("raw/{}/{name}", created.id),
            })
            .await?;
    }

    for kind in [MediaKind::Video, MediaKind::Trailer] {
        for status in [MediaStatus::Processing, MediaStatus::Completed] {
            let output = catalog
                .videos
                .process_audio_video_media(ProcessAudioVideoMediaInput {
                    video_id: created.id,
                    kind,
                    status,
                    encoded_location: Some(format!("encoded/{}/{kind}.mp4", created.id)),
                })
                .await?;
            tracing::info!(
                %kind,
                %status,
                is_published = output.is_published,
                "encoder report applied"
            );
        }
    }

    // 4. Report
    let video = catalog.videos.get_video(created.id).await?;
    tracing::info!(video_id = %video.id, is_published = video.is_published, "video state");

    for message in catalog.transport.messages().await {
        tracing::info!(
            exchange = %message.exchange,
            routing_key = %message.routing_key,
            payload = %message.payload,
            "message sent"
        );
    }
    for entry in catalog.videos.audit_trail(created.id).await? {
        tracing::info!(event_type = %entry.event_type, detail = %entry.detail, "audit entry");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> catalog::Result<()> {
    // 1. Initialize tracing and metrics
    let config = Config::from_env();
    telemetry::init_tracing(&config)?;
    let metrics_handle = telemetry::install_metrics()?;

    // 2. Pick storage and run the flow
    match &config.database_url {
        Some(url) => {
            tracing::info!("using PostgreSQL storage");
            let provider = PgTransactionProvider::connect(url, 5).await?;
            provider.run_migrations().await?;
            run_flow(&Catalog::postgres(&config, provider)).await?;
        }
        None => {
            tracing::info!("using in-memory storage");
            run_flow(&Catalog::in_memory(&config)).await?;
        }
    }

    // 3. Dump the metrics collected during the run
    tracing::info!(metrics = %metrics_handle.render(), "metrics snapshot");
    Ok(())
}
