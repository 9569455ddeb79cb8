//! Écriture d'une FeatureCollection GeoJSON
//!
//! Les géométries sont lues depuis le WKB et écrites par geozero directement
//! dans la sortie. Le document complet est assemblé par l'appelant.

use std::io::Write;

use geozero::geojson::GeoJsonWriter;
use geozero::wkb::process_wkb_geom;

use crate::error::ContoursError;
use crate::types::BoundaryRow;

/// Écrit une FeatureCollection complète, dans l'ordre des lignes
pub fn write_feature_collection<W: Write>(
    writer: &mut W,
    rows: &[BoundaryRow],
) -> Result<(), ContoursError> {
    writer
        .write_all(br#"{"type":"FeatureCollection","features":["#)
        .map_err(ContoursError::backend)?;

    for (i, row) in rows.iter().enumerate() {
        if i > 0 {
            writer.write_all(b",").map_err(ContoursError::backend)?;
        }
        write_feature(writer, row)?;
    }

    writer.write_all(b"]}").map_err(ContoursError::backend)?;
    Ok(())
}

/// Écrit une feature: géométrie convertie depuis le WKB, puis les propriétés
fn write_feature<W: Write>(writer: &mut W, row: &BoundaryRow) -> Result<(), ContoursError> {
    writer
        .write_all(br#"{"type":"Feature","geometry":"#)
        .map_err(ContoursError::backend)?;

    match &row.geometry {
        Some(wkb) => write_geometry(writer, wkb).map_err(|e| {
            ContoursError::backend(format!(
                "Invalid geometry for {}: {}",
                row.code_bureau_vote, e
            ))
        })?,
        None => writer.write_all(b"null").map_err(ContoursError::backend)?,
    }

    writer
        .write_all(br#","properties":"#)
        .map_err(ContoursError::backend)?;
    serde_json::to_writer(&mut *writer, &row.properties()).map_err(ContoursError::backend)?;
    writer.write_all(b"}").map_err(ContoursError::backend)?;

    Ok(())
}

/// Convertit une géométrie WKB en géométrie GeoJSON
///
/// En cas d'erreur, une géométrie partielle peut déjà avoir été écrite.
pub fn write_geometry<W: Write>(writer: &mut W, mut wkb: &[u8]) -> geozero::error::Result<()> {
    let mut geom_writer = GeoJsonWriter::new(writer);
    process_wkb_geom(&mut wkb, &mut geom_writer)
}
