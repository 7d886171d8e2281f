use std::fs;
use std::io::{Cursor, Write};

use firds_engine::{
    read_output_table, run_pipeline, FailureKind, FeedError, FetchSettings, NullProgressSink,
    PipelineConfig, PipelineError, ReqwestFetcher, OUTPUT_TABLE_FILENAME, WORKING_XML_FILENAME,
};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};
use zip::write::FileOptions;
use zip::ZipWriter;

const DELTA_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<BizData xmlns="urn:iso:std:iso:20022:tech:xsd:head.003.001.01">
  <Pyld>
    <FinInstrmRptgRefDataDltaRpt>
      <FinInstrm>
        <NewRcrd>
          <FinInstrmGnlAttrbts>
            <Id>ABC</Id>
            <FullNm>Foo</FullNm>
            <ClssfctnTp>X</ClssfctnTp>
            <CmmdtyDerivInd>N</CmmdtyDerivInd>
            <NtnlCcy>EUR</NtnlCcy>
          </FinInstrmGnlAttrbts>
          <Issr>ISSUER1</Issr>
        </NewRcrd>
      </FinInstrm>
    </FinInstrmRptgRefDataDltaRpt>
  </Pyld>
</BizData>"#;

fn feed_xml(download_link: &str, file_type: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<response>
  <result name="response" numFound="1" start="0">
    <doc>
      <str name="file_type">{file_type}</str>
      <str name="download_link">{download_link}</str>
    </doc>
  </result>
</response>"#
    )
}

fn single_entry_zip(name: &str, content: &[u8]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    writer.start_file(name, FileOptions::default()).unwrap();
    writer.write_all(content).unwrap();
    writer.finish().unwrap().into_inner()
}

#[tokio::test]
async fn full_run_writes_working_file_and_output_table() {
    let server = MockServer::start().await;
    let zip_url = format!("{}/firds/dltins_20210117.zip", server.uri());

    Mock::given(method("GET"))
        .and(path("/feed"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(feed_xml(&zip_url, "DLTINS"), "text/xml; charset=utf-8"),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/firds/dltins_20210117.zip"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            single_entry_zip("DLTINS_20210117.xml", DELTA_XML.as_bytes()),
            "application/zip",
        ))
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let fetcher = ReqwestFetcher::new(FetchSettings::default());
    let config = PipelineConfig::new(format!("{}/feed", server.uri()), temp.path());

    let summary = run_pipeline(&fetcher, &config, &NullProgressSink)
        .await
        .expect("pipeline ok");

    assert_eq!(summary.download_link, zip_url);
    assert_eq!(summary.record_count, 1);
    assert_eq!(summary.input_path, temp.path().join(WORKING_XML_FILENAME));
    assert_eq!(summary.output_path, temp.path().join(OUTPUT_TABLE_FILENAME));

    let persisted = fs::read_to_string(&summary.input_path).unwrap();
    assert_eq!(persisted, DELTA_XML);

    let rows = read_output_table(&summary.output_path).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id.as_deref(), Some("ABC"));
    assert_eq!(rows[0].issuer.as_deref(), Some("ISSUER1"));
}

#[tokio::test]
async fn missing_file_type_aborts_before_archive_download() {
    let server = MockServer::start().await;
    let zip_url = format!("{}/firds/full.zip", server.uri());

    Mock::given(method("GET"))
        .and(path("/feed"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(feed_xml(&zip_url, "FULINS"), "text/xml; charset=utf-8"),
        )
        .mount(&server)
        .await;
    // The archive endpoint must never be hit when no link is located.
    Mock::given(method("GET"))
        .and(path("/firds/full.zip"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let fetcher = ReqwestFetcher::new(FetchSettings::default());
    let config = PipelineConfig::new(format!("{}/feed", server.uri()), temp.path());

    let err = run_pipeline(&fetcher, &config, &NullProgressSink)
        .await
        .unwrap_err();
    assert!(
        matches!(err, PipelineError::Feed(FeedError::LinkNotFound { .. })),
        "got {err:?}"
    );
    assert!(!temp.path().join(WORKING_XML_FILENAME).exists());
    assert!(!temp.path().join(OUTPUT_TABLE_FILENAME).exists());
}

#[tokio::test]
async fn feed_http_error_aborts_the_run() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/feed"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let fetcher = ReqwestFetcher::new(FetchSettings::default());
    let config = PipelineConfig::new(format!("{}/feed", server.uri()), temp.path());

    let err = run_pipeline(&fetcher, &config, &NullProgressSink)
        .await
        .unwrap_err();
    match err {
        PipelineError::FeedFetch(fetch_err) => {
            assert_eq!(fetch_err.kind, FailureKind::HttpStatus(500));
        }
        other => panic!("expected FeedFetch, got {other:?}"),
    }
}

#[tokio::test]
async fn corrupt_archive_aborts_the_run() {
    let server = MockServer::start().await;
    let zip_url = format!("{}/firds/bad.zip", server.uri());

    Mock::given(method("GET"))
        .and(path("/feed"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(feed_xml(&zip_url, "DLTINS"), "text/xml; charset=utf-8"),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/firds/bad.zip"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(b"not a zip".to_vec(), "application/zip"))
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let fetcher = ReqwestFetcher::new(FetchSettings::default());
    let config = PipelineConfig::new(format!("{}/feed", server.uri()), temp.path());

    let err = run_pipeline(&fetcher, &config, &NullProgressSink)
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::Archive(_)), "got {err:?}");
    assert!(!temp.path().join(OUTPUT_TABLE_FILENAME).exists());
}
