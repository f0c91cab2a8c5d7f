use sqlx::SqliteConnection;

use crate::{
    db::traits::StoreError,
    db_types::{NewSong, Song},
};

pub async fn insert_song(song: NewSong, conn: &mut SqliteConnection) -> Result<i64, StoreError> {
    let result = sqlx::query("INSERT INTO songs (name, address, price, notes) VALUES ($1, $2, $3, $4)")
        .bind(&song.name)
        .bind(&song.address)
        .bind(song.price.value().to_string())
        .bind(&song.notes)
        .execute(conn)
        .await;
    match result {
        Ok(r) => Ok(r.last_insert_rowid()),
        Err(sqlx::Error::Database(de)) if de.is_unique_violation() => {
            Err(StoreError::DuplicateAddress(song.address))
        },
        Err(e) => Err(e.into()),
    }
}

pub async fn fetch_songs(conn: &mut SqliteConnection) -> Result<Vec<Song>, StoreError> {
    let songs = sqlx::query_as::<_, Song>("SELECT * FROM songs ORDER BY name").fetch_all(conn).await?;
    Ok(songs)
}

pub async fn fetch_song_by_id(id: i64, conn: &mut SqliteConnection) -> Result<Option<Song>, StoreError> {
    let song =
        sqlx::query_as::<_, Song>("SELECT * FROM songs WHERE id = ?").bind(id).fetch_optional(conn).await?;
    Ok(song)
}

pub async fn fetch_notes_by_address(
    address: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<String>, StoreError> {
    let notes = sqlx::query_scalar::<_, String>("SELECT notes FROM songs WHERE address = ?")
        .bind(address)
        .fetch_optional(conn)
        .await?;
    Ok(notes)
}

pub async fn list_addresses(conn: &mut SqliteConnection) -> Result<Vec<String>, StoreError> {
    let addresses =
        sqlx::query_scalar::<_, String>("SELECT address FROM songs ORDER BY id").fetch_all(conn).await?;
    Ok(addresses)
}
