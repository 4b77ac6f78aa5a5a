use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use metrics_util::debugging::{DebugValue, DebuggingRecorder};
use revocation_cache::cache::{
    CacheConfig, FetchError, MemoryRevocationStore, RemoteFetcher, RevocationCache,
};
use revocation_cache::domain::certificate::CertificateToken;
use revocation_cache::domain::revocation::{RevocationEvidence, RevocationKind, RevocationStatus};
use revocation_cache::infra::telemetry;
use time::OffsetDateTime;

struct FlakyFetcher;

#[async_trait]
impl RemoteFetcher for FlakyFetcher {
    async fn fetch(
        &self,
        certificate: &CertificateToken,
        _issuer: &CertificateToken,
        _timeout: Duration,
    ) -> Result<RevocationEvidence, FetchError> {
        if certificate.serial_number == [0xFF] {
            return Err(FetchError::unavailable("responder returned internalError"));
        }

        let now = OffsetDateTime::now_utc();
        Ok(RevocationEvidence {
            kind: RevocationKind::Ocsp,
            status: RevocationStatus::Good,
            this_update: now,
            next_update: Some(now + Duration::from_secs(3600)),
            produced_at: now,
            source_url: None,
            encoded: vec![0x30, 0x00],
        })
    }
}

fn token(serial: u8, subject: &str) -> CertificateToken {
    CertificateToken::new(
        vec![serial],
        subject.as_bytes().to_vec(),
        b"CN=Metrics CA".to_vec(),
        format!("{subject}-key").into_bytes(),
    )
}

#[tokio::test]
async fn lookup_paths_emit_expected_metric_keys() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder
        .install()
        .expect("debug metrics recorder should install in this test process");
    telemetry::describe_metrics();

    let cache = RevocationCache::new(
        Arc::new(MemoryRevocationStore::provisioned()),
        &CacheConfig::default(),
    )
    .with_fetcher(Arc::new(FlakyFetcher));
    let issuer = token(0x01, "CN=Metrics CA");

    // miss + fetch, then hit
    let good = token(0x02, "CN=good.example");
    for _ in 0..2 {
        cache
            .get_revocation_answer(&good, &issuer)
            .await
            .expect("lookup")
            .expect("answer");
    }

    // miss + failed fetch
    let failing = token(0xFF, "CN=down.example");
    assert!(
        cache
            .get_revocation_answer(&failing, &issuer)
            .await
            .expect("lookup")
            .is_none()
    );

    let counters: HashMap<String, u64> = snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .filter_map(|(composite_key, _, _, value)| match value {
            DebugValue::Counter(count) => Some((composite_key.key().name().to_string(), count)),
            _ => None,
        })
        .collect();

    let expected = [
        ("revocation_cache_hit_total", 1),
        ("revocation_cache_miss_total", 2),
        ("revocation_cache_fetch_total", 2),
        ("revocation_cache_fetch_failed_total", 1),
    ];

    for (metric, count) in expected {
        assert_eq!(counters.get(metric), Some(&count), "metric: {metric}");
    }
}
