use mockall::mock;
use pianano_engine::{
    db_types::{NewPayment, NewSong, Payment, Song},
    DonationTotals, MusicStore, StoreError,
};

mock! {
    pub MusicDb {}
    impl MusicStore for MusicDb {
        fn url(&self) -> &str;
        async fn insert_song(&self, song: NewSong) -> Result<i64, StoreError>;
        async fn fetch_songs(&self) -> Result<Vec<Song>, StoreError>;
        async fn fetch_song_by_id(&self, id: i64) -> Result<Option<Song>, StoreError>;
        async fn fetch_notes_by_address(&self, address: &str) -> Result<Option<String>, StoreError>;
        async fn list_addresses(&self) -> Result<Vec<String>, StoreError>;
        async fn insert_payment(&self, payment: NewPayment) -> Result<i64, StoreError>;
        async fn fetch_payments_for_address(&self, address: &str) -> Result<Vec<Payment>, StoreError>;
        async fn donation_totals(&self) -> Result<DonationTotals, StoreError>;
    }
}
