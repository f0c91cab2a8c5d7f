//! The matching pipeline: confirmation events in, paid flags, payment rows and playback out.
use log::*;
use tokio::{sync::mpsc, task::JoinHandle};

use crate::{
    db::traits::MusicStore,
    db_types::NewPayment,
    device::DeviceHandle,
    feed::ConfirmationEvent,
    registry::AddressRegistry,
};

/// Consumes parsed confirmation events in arrival order and runs each through
/// match → persist → look up → play.
///
/// The paid flag is set first because it is what payers poll; persistence and playback come
/// after, and a failure in either is logged without unwinding the flag. Payment confirmation is
/// the contract, playback is best-effort.
pub struct PaymentFlow<B> {
    store: B,
    registry: AddressRegistry,
    device: DeviceHandle,
    events: mpsc::Receiver<ConfirmationEvent>,
}

impl<B> PaymentFlow<B>
where B: MusicStore + Send + Sync + 'static
{
    pub fn new(
        store: B,
        registry: AddressRegistry,
        device: DeviceHandle,
        events: mpsc::Receiver<ConfirmationEvent>,
    ) -> Self {
        Self { store, registry, device, events }
    }

    /// Runs until the feed event channel closes. Do not await the returned handle.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move { self.run().await })
    }

    async fn run(mut self) {
        info!("🔄️💰️ Payment matcher started");
        while let Some(event) = self.events.recv().await {
            self.handle_event(event).await;
        }
        info!("🔄️💰️ Feed event channel closed. Payment matcher stopping.");
    }

    pub async fn handle_event(&self, event: ConfirmationEvent) {
        let Some(recipient) = event.recipient else {
            trace!("🔄️💰️ Confirmation from {} carries no recipient. Ignoring.", event.sender);
            return;
        };
        if !self.registry.mark_paid(&recipient) {
            trace!("🔄️💰️ {recipient} is not monitored. Ignoring.");
            return;
        }
        info!("🔄️💰️ Payment of {} received for {recipient}", event.amount);

        // The flag above is what pollers see; a store hiccup must not take it back.
        match self.store.insert_payment(NewPayment::new(recipient.clone(), event.amount)).await {
            Ok(id) => debug!("🔄️💰️ Payment recorded with id {id}"),
            Err(e) => error!("🔄️💰️ Could not record the payment for {recipient}: {e}. The paid flag stands."),
        }

        let notes = match self.store.fetch_notes_by_address(&recipient).await {
            Ok(Some(notes)) => notes,
            Ok(None) => {
                warn!("🔄️💰️ No song is linked to {recipient}. Nothing to play.");
                return;
            },
            Err(e) => {
                error!("🔄️💰️ Could not look up the song for {recipient}: {e}");
                return;
            },
        };

        match self.device.send_payload(notes).await {
            Ok(()) => info!("🔄️💰️ Song for {recipient} sent to the piano"),
            Err(e) => {
                error!("🔄️💰️ Playback for {recipient} failed: {e}. The payment remains confirmed.")
            },
        }
    }
}

#[cfg(test)]
mod test {
    use mockall::mock;
    use pnn_common::RawNano;
    use tokio::sync::mpsc;

    use super::*;
    use crate::{
        db::traits::{DonationTotals, StoreError},
        db_types::{NewSong, Payment, Song},
        feed::test_handle,
        test_support::{spawn_dead_device, spawn_device},
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

    const ADDRESS: &str = "nano_1recipient";
    const SCORE: &str = "1,5/200.3/100";

    fn confirmation(recipient: Option<&str>) -> ConfirmationEvent {
        ConfirmationEvent {
            sender: "nano_1sender".to_string(),
            recipient: recipient.map(|r| r.to_string()),
            amount: RawNano::from(100u128),
        }
    }

    fn flow(store: MockMusicDb, registry: AddressRegistry, device: DeviceHandle) -> PaymentFlow<MockMusicDb> {
        let (_tx, rx) = mpsc::channel(8);
        PaymentFlow::new(store, registry, device, rx)
    }

    fn payload_writes(writes: &std::sync::Mutex<Vec<Vec<u8>>>) -> Vec<Vec<u8>> {
        // The open sequence writes a lone pulse byte; everything else is a payload.
        writes.lock().unwrap().iter().filter(|w| w.as_slice() != [b'h']).cloned().collect()
    }

    #[tokio::test]
    async fn matched_payment_is_flagged_recorded_and_played() {
        let _ = env_logger::try_init();
        let (feed, _cmds) = test_handle();
        let registry = AddressRegistry::new(feed);
        registry.ensure(ADDRESS);

        let mut store = MockMusicDb::new();
        store
            .expect_insert_payment()
            .withf(|p| p.address == ADDRESS && p.amount == RawNano::from(100u128))
            .times(1)
            .returning(|_| Ok(1));
        store
            .expect_fetch_notes_by_address()
            .withf(|a| a == ADDRESS)
            .times(1)
            .returning(|_| Ok(Some(SCORE.to_string())));

        let (device, writes) = spawn_device();
        let flow = flow(store, registry.clone(), device);
        flow.handle_event(confirmation(Some(ADDRESS))).await;

        assert!(registry.is_paid(ADDRESS));
        let payloads = payload_writes(&writes);
        assert_eq!(payloads, vec![format!("{SCORE}\n").into_bytes()]);
    }

    #[tokio::test]
    async fn event_without_recipient_has_no_side_effects() {
        let _ = env_logger::try_init();
        let (feed, _cmds) = test_handle();
        let registry = AddressRegistry::new(feed);
        registry.ensure(ADDRESS);

        let store = MockMusicDb::new();
        let (device, writes) = spawn_device();
        let flow = flow(store, registry.clone(), device);
        flow.handle_event(confirmation(None)).await;

        assert!(!registry.is_paid(ADDRESS));
        assert!(payload_writes(&writes).is_empty());
    }

    #[tokio::test]
    async fn unmonitored_recipient_has_no_side_effects() {
        let _ = env_logger::try_init();
        let (feed, _cmds) = test_handle();
        let registry = AddressRegistry::new(feed);

        let store = MockMusicDb::new();
        let (device, writes) = spawn_device();
        let flow = flow(store, registry.clone(), device);
        flow.handle_event(confirmation(Some(ADDRESS))).await;

        assert!(!registry.is_paid(ADDRESS));
        assert!(payload_writes(&writes).is_empty());
    }

    #[tokio::test]
    async fn store_failure_does_not_revert_the_flag_or_stop_playback() {
        let _ = env_logger::try_init();
        let (feed, _cmds) = test_handle();
        let registry = AddressRegistry::new(feed);
        registry.ensure(ADDRESS);

        let mut store = MockMusicDb::new();
        store
            .expect_insert_payment()
            .times(1)
            .returning(|_| Err(StoreError::DatabaseError(sqlx::Error::PoolTimedOut)));
        store.expect_fetch_notes_by_address().times(1).returning(|_| Ok(Some(SCORE.to_string())));

        let (device, writes) = spawn_device();
        let flow = flow(store, registry.clone(), device);
        flow.handle_event(confirmation(Some(ADDRESS))).await;

        assert!(registry.is_paid(ADDRESS), "a store error must not unwind the paid flag");
        assert_eq!(payload_writes(&writes).len(), 1);
    }

    #[tokio::test]
    async fn orphaned_address_is_flagged_but_not_played() {
        let _ = env_logger::try_init();
        let (feed, _cmds) = test_handle();
        let registry = AddressRegistry::new(feed);
        registry.ensure(ADDRESS);

        let mut store = MockMusicDb::new();
        store.expect_insert_payment().times(1).returning(|_| Ok(1));
        store.expect_fetch_notes_by_address().times(1).returning(|_| Ok(None));

        let (device, writes) = spawn_device();
        let flow = flow(store, registry.clone(), device);
        flow.handle_event(confirmation(Some(ADDRESS))).await;

        assert!(registry.is_paid(ADDRESS));
        assert!(payload_writes(&writes).is_empty());
    }

    #[tokio::test]
    async fn device_failure_does_not_revert_the_flag() {
        let _ = env_logger::try_init();
        let (feed, _cmds) = test_handle();
        let registry = AddressRegistry::new(feed);
        registry.ensure(ADDRESS);

        let mut store = MockMusicDb::new();
        store.expect_insert_payment().times(1).returning(|_| Ok(1));
        store.expect_fetch_notes_by_address().times(1).returning(|_| Ok(Some(SCORE.to_string())));

        let device = spawn_dead_device();
        let flow = flow(store, registry.clone(), device);
        flow.handle_event(confirmation(Some(ADDRESS))).await;

        assert!(registry.is_paid(ADDRESS), "playback failure must not unwind the paid flag");
    }

    #[tokio::test]
    async fn duplicate_confirmations_each_get_a_payment_row() {
        let _ = env_logger::try_init();
        let (feed, _cmds) = test_handle();
        let registry = AddressRegistry::new(feed);
        registry.ensure(ADDRESS);

        let mut store = MockMusicDb::new();
        store.expect_insert_payment().times(2).returning(|_| Ok(1));
        store.expect_fetch_notes_by_address().times(2).returning(|_| Ok(Some(SCORE.to_string())));

        let (device, writes) = spawn_device();
        let flow = flow(store, registry.clone(), device);
        flow.handle_event(confirmation(Some(ADDRESS))).await;
        flow.handle_event(confirmation(Some(ADDRESS))).await;

        assert!(registry.is_paid(ADDRESS));
        assert_eq!(payload_writes(&writes).len(), 2);
    }
}
