//! Parquet encoding and decoding of table snapshots.

use arrow::compute::concat_batches;
use arrow::record_batch::RecordBatch;
use bytes::Bytes;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;

use super::error::CodecError;

/// Decode a whole Parquet file into a single RecordBatch.
///
/// Column order and types come from the embedded schema; row groups are
/// concatenated in file order.
pub fn decode_parquet(bytes: Bytes) -> Result<RecordBatch, CodecError> {
    let builder = ParquetRecordBatchReaderBuilder::try_new(bytes)?;
    let schema = builder.schema().clone();

    let metadata = builder.metadata();
    tracing::debug!(
        row_groups = metadata.num_row_groups(),
        rows = metadata.file_metadata().num_rows(),
        "decoding parquet snapshot"
    );

    let reader = builder.build()?;
    let batches = reader.collect::<Result<Vec<_>, _>>()?;

    Ok(concat_batches(&schema, &batches)?)
}

/// Encode a RecordBatch as a Snappy-compressed Parquet file
pub fn encode_parquet(batch: &RecordBatch) -> Result<Bytes, CodecError> {
    let properties = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();

    let mut writer = ArrowWriter::try_new(Vec::new(), batch.schema(), Some(properties))?;
    writer.write(batch)?;
    let buffer = writer.into_inner()?;

    Ok(Bytes::from(buffer))
}
