mod common;

use common::CyclingGenerator;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use shortlink::application::services::{CreateLink, LinkService};
use shortlink::domain::repositories::UrlRepository;
use shortlink::error::AppError;
use shortlink::infrastructure::cache::NullCache;
use shortlink::infrastructure::persistence::MemoryRepository;
use shortlink::utils::code_generator::RandomCodeGenerator;

fn service(repo: Arc<MemoryRepository>, generator: CyclingGenerator) -> Arc<LinkService> {
    Arc::new(LinkService::new(
        repo,
        Arc::new(NullCache::new()),
        Arc::new(generator),
        "http://sho.rt".to_string(),
        Duration::from_secs(60),
        5,
    ))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_allocation_never_duplicates_codes() {
    let repo = Arc::new(MemoryRepository::new());
    let pool: Vec<String> = (0..20).map(|i| format!("pool{i:03}")).collect();
    let service = service(repo.clone(), CyclingGenerator::new(pool));

    let tasks: Vec<_> = (0..50)
        .map(|i| {
            let service = service.clone();
            tokio::spawn(async move {
                service
                    .create_short_link(CreateLink::new(format!("https://example.com/{i}")))
                    .await
            })
        })
        .collect();

    let mut codes = HashSet::new();
    let mut exhausted = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(record) => assert!(codes.insert(record.code), "duplicate code issued"),
            Err(AppError::AllocationExhausted { .. }) => exhausted += 1,
            Err(e) => panic!("unexpected error: {e}"),
        }
    }

    assert_eq!(codes.len(), 20);
    assert_eq!(exhausted, 30);
    assert_eq!(repo.count().await.unwrap(), 20);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_custom_code_has_single_winner() {
    let repo = Arc::new(MemoryRepository::new());
    let service = service(repo.clone(), CyclingGenerator::new(["unused1"]));

    let tasks: Vec<_> = (0..16)
        .map(|i| {
            let service = service.clone();
            tokio::spawn(async move {
                let mut request = CreateLink::new(format!("https://example.com/{i}"));
                request.custom_code = Some("contested".to_string());
                service.create_short_link(request).await
            })
        })
        .collect();

    let mut winners = 0;
    let mut conflicts = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => winners += 1,
            Err(AppError::Conflict { .. }) => conflicts += 1,
            Err(e) => panic!("unexpected error: {e}"),
        }
    }

    assert_eq!(winners, 1);
    assert_eq!(conflicts, 15);
    assert_eq!(repo.insert_attempts(), 16);
}

#[tokio::test]
async fn test_random_codes_are_unique_in_practice() {
    let repo = Arc::new(MemoryRepository::new());
    let service = LinkService::new(
        repo.clone(),
        Arc::new(NullCache::new()),
        Arc::new(RandomCodeGenerator::default()),
        "http://sho.rt".to_string(),
        Duration::from_secs(60),
        5,
    );

    for i in 0..500 {
        service
            .create_short_link(CreateLink::new(format!("https://example.com/{i}")))
            .await
            .unwrap();
    }

    assert_eq!(repo.count().await.unwrap(), 500);
}
