mod common;

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use alloy::primitives::{Address, U256};
    use eyre::Result;
    use store::{MemoryStore, Persistence, SqliteStore, SyncOption, TransferType};
    use sync::Runnable;
    use tokio::sync::broadcast;
    use tokio_util::sync::CancellationToken;

    use engine::balance::cache::BalanceCache;
    use engine::balance::token::get_token_balances;
    use engine::command::erc20_historical::Erc20HistoricalCommand;
    use engine::command::eth_historical::EthHistoricalCommand;
    use engine::command::guard::RunningSet;
    use engine::command::history::{HistoryRange, resolve_ranges};
    use engine::command::new_blocks::NewBlocksCommand;
    use engine::command::range::find_first_range;
    use engine::downloader::bisect::{
        BinaryIterativeDownloader, Bisection, ConcurrentDownloader, download_eth_concurrently,
    };
    use engine::downloader::erc20::{Erc20TransfersDownloader, token_transfer_id};
    use engine::downloader::eth::EthTransferDownloader;
    use engine::downloader::handle::BatchDownloader;
    use engine::{EngineError, EthBackfill, Event, EventFeed, EventType, Reactor, ReactorState};

    use crate::common::{BASE_BALANCE, FakeChain, block_hash, context, test_args};

    const ALICE: Address = Address::repeat_byte(0xA1);
    const BOB: Address = Address::repeat_byte(0xB0);
    const TOKEN: Address = Address::repeat_byte(0x70);

    fn bisection(chain: &Arc<FakeChain>, store: Arc<dyn Persistence>) -> Arc<Bisection> {
        let cache = Arc::new(BalanceCache::new());
        let downloader = EthTransferDownloader::new(chain.clone(), cache.clone(), vec![ALICE]);
        Arc::new(Bisection {
            client: chain.clone(),
            cache,
            downloader: Arc::new(downloader),
            store,
            address: ALICE,
        })
    }

    async fn next_event(
        events: &mut broadcast::Receiver<Event>,
        wanted: impl Fn(&Event) -> bool,
    ) -> Result<Event> {
        let found = tokio::time::timeout(Duration::from_secs(10), async {
            loop {
                let event = events.recv().await?;
                if wanted(&event) {
                    return Ok::<_, broadcast::error::RecvError>(event);
                }
            }
        })
        .await??;
        Ok(found)
    }

    #[tokio::test]
    async fn test_new_block_with_payment() -> Result<()> {
        let chain = FakeChain::new(9);
        chain.extend(1, 0);
        let payment = chain.pay(10, BOB, ALICE, 500);
        let store = Arc::new(MemoryStore::new());
        let feed = EventFeed::default();
        let mut events = feed.subscribe();
        let ctx = context(chain.clone(), store.clone(), feed, test_args(vec![ALICE]));

        let mut command = NewBlocksCommand::new(ctx, vec![ALICE], Some(chain.header(9)));
        let event = command.tick().await?;

        let expected = Event::new(EventType::NewBlock, Some(10), vec![ALICE]);
        assert_eq!(event, Some(expected.clone()));
        assert_eq!(events.recv().await?, expected);
        assert_eq!(command.previous(), Some(chain.header(10)));

        let transfers = store.get_transfers(ALICE, 0, None).await?;
        assert_eq!(transfers.len(), 1);
        assert_eq!(transfers[0].id, payment);
        assert_eq!(transfers[0].value, U256::from(500u64));
        assert_eq!(transfers[0].transfer_type, TransferType::Eth);
        let live = store.get_latest_synced(ALICE, SyncOption::LIVE).await?;
        assert_eq!(live, Some(chain.header(10)));

        // Nothing new at the tip.
        assert_eq!(command.tick().await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_reorg_replaces_dropped_fork() -> Result<()> {
        let chain = FakeChain::new(10);
        chain.pay(10, BOB, ALICE, 100);
        let store = Arc::new(MemoryStore::new());
        let feed = EventFeed::default();
        let ctx = context(chain.clone(), store.clone(), feed, test_args(vec![ALICE]));
        let mut command = NewBlocksCommand::new(ctx, vec![ALICE], None);

        let first = command.tick().await?;
        assert_eq!(first.map(|e| e.block_number), Some(Some(10)));
        chain.extend(2, 0);
        command.tick().await?;
        command.tick().await?;
        assert_eq!(command.previous(), Some(chain.header(12)));

        // Blocks 10..=12 are replaced and the new fork is one block longer.
        chain.reorg(3, 1);
        chain.extend(1, 1);
        let replacement = chain.pay(11, BOB, ALICE, 200);

        let event = command.tick().await?;
        assert_eq!(event, Some(Event::new(EventType::Reorg, Some(10), vec![ALICE])));
        assert_eq!(command.previous(), Some(chain.header(13)));
        assert_eq!(command.previous().map(|h| h.hash), Some(block_hash(13, 1)));

        let transfers = store.get_transfers(ALICE, 0, None).await?;
        assert_eq!(transfers.len(), 1);
        assert_eq!(transfers[0].id, replacement);
        assert_eq!(transfers[0].block.hash, block_hash(11, 1));
        assert!(!store.header_exists(block_hash(12, 0)).await?);
        assert_eq!(store.get_header_by_number(12).await?, Some(chain.header(12)));

        assert_eq!(command.tick().await?, None);
        chain.extend(1, 1);
        let event = command.tick().await?;
        assert_eq!(event, Some(Event::new(EventType::NewBlock, Some(14), vec![])));
        Ok(())
    }

    #[tokio::test]
    async fn test_on_new_block_is_idempotent() -> Result<()> {
        let chain = FakeChain::new(5);
        let store = Arc::new(MemoryStore::new());
        let args = test_args(vec![ALICE]);
        let ctx = context(chain.clone(), store.clone(), EventFeed::default(), args);
        let command = NewBlocksCommand::new(ctx, vec![ALICE], Some(chain.header(4)));

        let latest = chain.header(5);
        let (added, removed) = command.on_new_block(Some(&chain.header(4)), latest).await?;
        assert_eq!((added, removed), (vec![latest], vec![]));

        store.process_transfers(&[], &[ALICE], &[latest], &[], SyncOption::ALL).await?;
        let (added, removed) = command.on_new_block(Some(&chain.header(4)), latest).await?;
        assert!(added.is_empty() && removed.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_parent_fails_reorg() -> Result<()> {
        let chain = FakeChain::new(5);
        let store = Arc::new(MemoryStore::new());
        let ctx = context(chain.clone(), store, EventFeed::default(), test_args(vec![ALICE]));
        let command = NewBlocksCommand::new(ctx, vec![ALICE], None);

        let mut orphan = chain.header(5);
        orphan.hash = block_hash(5, 9);
        orphan.parent_hash = block_hash(4, 9);
        let error = command.on_new_block(Some(&chain.header(4)), orphan).await.unwrap_err();
        assert!(matches!(
            error.downcast_ref::<EngineError>(),
            Some(EngineError::MissingParent(hash)) if *hash == block_hash(4, 9)
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_failed_commit_keeps_cursor() -> Result<()> {
        let chain = FakeChain::new(9);
        chain.extend(1, 0);
        chain.pay(10, BOB, ALICE, 500);
        let store = Arc::new(MemoryStore::new());
        let feed = EventFeed::default();
        let ctx = context(chain.clone(), store.clone(), feed, test_args(vec![ALICE]));
        let mut command = NewBlocksCommand::new(ctx, vec![ALICE], Some(chain.header(9)));

        store.fail_next_process();
        assert!(command.tick().await.is_err());
        assert_eq!(command.previous(), Some(chain.header(9)));
        assert_eq!(store.transfer_count(), 0);
        assert_eq!(store.get_latest_synced(ALICE, SyncOption::LIVE).await?, None);

        // The retry picks the same block up again.
        let event = command.tick().await?;
        assert_eq!(event.and_then(|e| e.block_number), Some(10));
        assert_eq!(store.transfer_count(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_concurrent_bisection_downloads_changed_block_only() -> Result<()> {
        let chain = FakeChain::new(16);
        chain.pay(11, BOB, ALICE, 42);
        let store = Arc::new(MemoryStore::new());
        let token = CancellationToken::new();

        let concurrent = ConcurrentDownloader::new(&token, 2);
        download_eth_concurrently(&concurrent, bisection(&chain, store.clone()), 0, 16);
        concurrent.wait().await?;

        assert_eq!(concurrent.blocks(), vec![11]);
        assert_eq!(concurrent.transfers().len(), 1);
        assert_eq!(chain.calls.count("eth_getBlockByNumber"), 1);
        assert_eq!(store.get_transfers(ALICE, 0, None).await?.len(), 1);
        // Leaves store transfers only; the cursor is the caller's.
        assert_eq!(store.get_earliest_synced(ALICE, SyncOption::ETH).await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_binary_iterative_visit_order() -> Result<()> {
        let chain = FakeChain::new(3);
        chain.pay(3, BOB, ALICE, 7);
        let store = Arc::new(MemoryStore::new());
        let mut iterator = BinaryIterativeDownloader::new(bisection(&chain, store), 0, 3);

        let mut visited = Vec::new();
        let mut downloaded = Vec::new();
        while !iterator.finished() {
            let step = iterator.next().await?;
            if !step.transfers.is_empty() {
                downloaded.push((step.low, step.high));
            }
            visited.push((step.low, step.high));
        }
        assert_eq!(visited, vec![(0, 3), (1, 3), (2, 3), (1, 2), (0, 1)]);
        assert_eq!(downloaded, vec![(2, 3)]);
        Ok(())
    }

    #[tokio::test]
    async fn test_binary_iterative_revert_repeats_step() -> Result<()> {
        let chain = FakeChain::new(8);
        let store = Arc::new(MemoryStore::new());
        let mut iterator = BinaryIterativeDownloader::new(bisection(&chain, store), 0, 8);

        let step = iterator.next().await?;
        assert_eq!((step.low, step.high), (0, 8));
        assert_eq!(iterator.high(), 0);
        iterator.revert();
        assert_eq!((iterator.low(), iterator.high()), (0, 8));
        assert!(!iterator.finished());
        Ok(())
    }

    #[tokio::test]
    async fn test_eth_history_resumable_checkpoints() -> Result<()> {
        let chain = FakeChain::new(20);
        chain.pay(4, BOB, ALICE, 10);
        chain.pay(13, ALICE, BOB, 3);
        let store = Arc::new(MemoryStore::new());
        let feed = EventFeed::default();
        let mut events = feed.subscribe();
        let mut args = test_args(vec![ALICE]);
        args.eth_backfill = EthBackfill::Resumable;
        let ctx = context(chain.clone(), store.clone(), feed, args);

        let mut command = EthHistoricalCommand::new(ctx.clone(), ALICE, 20);
        command.run(&CancellationToken::new()).await?;

        let transfers = store.get_transfers(ALICE, 0, None).await?;
        let blocks: Vec<u64> = transfers.iter().map(|t| t.block.number).collect();
        assert_eq!(blocks, vec![4, 13]);
        let earliest = store.get_earliest_synced(ALICE, SyncOption::ETH).await?;
        assert_eq!(earliest, Some(chain.header(0)));
        assert_eq!(events.recv().await?.event_type, EventType::NewHistory);

        assert!(resolve_ranges(&ctx, ALICE, SyncOption::ETH, 20).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_eth_history_resumable_failed_step_keeps_cursor() -> Result<()> {
        let chain = FakeChain::new(8);
        chain.pay(5, BOB, ALICE, 10);
        let store = Arc::new(MemoryStore::new());
        let mut args = test_args(vec![ALICE]);
        args.eth_backfill = EthBackfill::Resumable;
        let ctx = context(chain.clone(), store.clone(), EventFeed::default(), args);
        let mut command = EthHistoricalCommand::new(ctx, ALICE, 8);

        // The start mark goes through, the first step down does not.
        store.fail_process_after(1);
        assert!(command.run(&CancellationToken::new()).await.is_err());
        let earliest = store.get_earliest_synced(ALICE, SyncOption::ETH).await?;
        assert_eq!(earliest, Some(chain.header(8)));
        assert_eq!(store.transfer_count(), 0);

        command.run(&CancellationToken::new()).await?;
        let earliest = store.get_earliest_synced(ALICE, SyncOption::ETH).await?;
        assert_eq!(earliest, Some(chain.header(0)));
        let transfers = store.get_transfers(ALICE, 0, None).await?;
        assert_eq!(transfers.len(), 1);
        assert_eq!(transfers[0].block.number, 5);
        Ok(())
    }

    #[tokio::test]
    async fn test_resolve_ranges_fills_gap_before_backward() -> Result<()> {
        let chain = FakeChain::new(40);
        let store = Arc::new(MemoryStore::new());
        let args = test_args(vec![ALICE]);
        let ctx = context(chain.clone(), store.clone(), EventFeed::default(), args);

        let fresh = resolve_ranges(&ctx, ALICE, SyncOption::ETH, 35).await?;
        assert_eq!(fresh, vec![HistoryRange::backward(0, 35)]);

        // History down to 12, live up to 20.
        store
            .process_transfers(&[], &[ALICE], &[chain.header(12)], &[], SyncOption::ETH)
            .await?;
        store.process_transfers(&[], &[ALICE], &[chain.header(20)], &[], SyncOption::ALL).await?;
        let ranges = resolve_ranges(&ctx, ALICE, SyncOption::ETH, 35).await?;
        assert_eq!(ranges, vec![HistoryRange::gap(20, 35), HistoryRange::backward(0, 12)]);
        assert_eq!(ranges[1].step_option(SyncOption::ETH), SyncOption::ETH);
        assert_eq!(ranges[0].step_option(SyncOption::ETH), SyncOption::NONE);

        // Nothing to fill when the live cursor is past the target.
        let ranges = resolve_ranges(&ctx, ALICE, SyncOption::ETH, 18).await?;
        assert_eq!(ranges, vec![HistoryRange::backward(0, 12)]);
        Ok(())
    }

    #[tokio::test]
    async fn test_eth_history_concurrent() -> Result<()> {
        let chain = FakeChain::new(32);
        chain.pay(9, BOB, ALICE, 10);
        chain.pay(27, BOB, ALICE, 11);
        let store = Arc::new(MemoryStore::new());
        let args = test_args(vec![ALICE]);
        let ctx = context(chain.clone(), store.clone(), EventFeed::default(), args);

        let mut command = EthHistoricalCommand::new(ctx, ALICE, 32);
        command.run(&CancellationToken::new()).await?;

        assert_eq!(store.get_transfers(ALICE, 0, None).await?.len(), 2);
        let earliest = store.get_earliest_synced(ALICE, SyncOption::ETH).await?;
        assert_eq!(earliest.map(|h| h.number), Some(0));
        Ok(())
    }

    #[tokio::test]
    async fn test_erc20_history_in_batches() -> Result<()> {
        let chain = FakeChain::new(20);
        let inbound = chain.token_transfer(3, TOKEN, BOB, ALICE, 1_000);
        let outbound = chain.token_transfer(15, TOKEN, ALICE, BOB, 400);
        chain.token_transfer(16, TOKEN, BOB, BOB, 1);
        let store = Arc::new(MemoryStore::new());
        let feed = EventFeed::default();
        let mut events = feed.subscribe();
        let mut args = test_args(vec![ALICE]);
        args.erc20_batch_size = 4;
        let ctx = context(chain.clone(), store.clone(), feed, args);

        let mut command = Erc20HistoricalCommand::new(ctx, ALICE, 20);
        command.run(&CancellationToken::new()).await?;

        let transfers = store.get_transfers(ALICE, 0, None).await?;
        assert_eq!(transfers.len(), 2);
        assert_eq!(transfers[0].transaction_hash, inbound);
        assert_eq!(transfers[0].id, token_transfer_id(inbound, 0));
        assert_eq!(transfers[0].contract, Some(TOKEN));
        assert_eq!(transfers[0].to, Some(ALICE));
        assert_eq!(transfers[1].transaction_hash, outbound);
        assert_eq!(transfers[1].from, ALICE);
        assert_eq!(transfers[1].value, U256::from(400u64));

        // Marked at 20, then batch by batch: 16, 12, 8, 4, 0.
        let earliest = store.get_earliest_synced(ALICE, SyncOption::ERC20).await?;
        assert_eq!(earliest.map(|h| h.number), Some(0));
        let latest = store.get_latest_synced(ALICE, SyncOption::ERC20).await?;
        assert_eq!(latest.map(|h| h.number), Some(20));
        assert_eq!(store.get_earliest_synced(ALICE, SyncOption::ETH).await?, None);

        let first = events.recv().await?;
        assert_eq!(first, Event::new(EventType::NewHistory, Some(12), vec![ALICE]));
        Ok(())
    }

    #[tokio::test]
    async fn test_erc20_history_failed_batch_keeps_cursor() -> Result<()> {
        let chain = FakeChain::new(20);
        chain.token_transfer(15, TOKEN, BOB, ALICE, 7);
        let store = Arc::new(MemoryStore::new());
        let mut args = test_args(vec![ALICE]);
        args.erc20_batch_size = 4;
        let ctx = context(chain.clone(), store.clone(), EventFeed::default(), args);
        let mut command = Erc20HistoricalCommand::new(ctx, ALICE, 20);

        // Start mark and [16, 20] go through, [12, 16] fails.
        store.fail_process_after(2);
        assert!(command.run(&CancellationToken::new()).await.is_err());
        let earliest = store.get_earliest_synced(ALICE, SyncOption::ERC20).await?;
        assert_eq!(earliest.map(|h| h.number), Some(16));
        assert_eq!(store.transfer_count(), 0);

        command.run(&CancellationToken::new()).await?;
        let earliest = store.get_earliest_synced(ALICE, SyncOption::ERC20).await?;
        assert_eq!(earliest.map(|h| h.number), Some(0));
        let transfers = store.get_transfers(ALICE, 0, None).await?;
        assert_eq!(transfers.len(), 1);
        assert_eq!(transfers[0].block.number, 15);
        Ok(())
    }

    #[tokio::test]
    async fn test_erc20_log_resolution_follows_cancellation() -> Result<()> {
        let chain = FakeChain::new(20);
        chain.token_transfer(9, TOKEN, BOB, ALICE, 7);
        let token = CancellationToken::new();
        token.cancel();
        let downloader =
            Erc20TransfersDownloader::new(chain.clone(), vec![ALICE]).with_cancellation(token);

        let error = downloader.get_transfers_in_range(0, 20).await.unwrap_err();
        assert!(sync::error::is_cancellation(&error));
        assert_eq!(chain.calls.count("eth_getTransactionReceipt"), 0);
        Ok(())
    }

    #[test]
    fn test_token_transfer_id_depends_on_log_index() {
        let tx = block_hash(1, 1);
        assert_ne!(token_transfer_id(tx, 0), token_transfer_id(tx, 1));
        assert_eq!(token_transfer_id(tx, 3), token_transfer_id(tx, 3));
    }

    #[tokio::test]
    async fn test_token_balances_swallow_failures() -> Result<()> {
        let chain = FakeChain::new(1);
        let broken = Address::repeat_byte(0x71);
        chain.set_token_balance(ALICE, TOKEN, 250);
        chain.fail_token(broken);

        let tokens = [TOKEN, broken];
        let balances = get_token_balances(chain.as_ref(), &[ALICE, BOB], &tokens, None).await;
        assert_eq!(balances.len(), 2);
        assert_eq!(balances[&ALICE][&TOKEN], U256::from(250u64));
        assert_eq!(balances[&ALICE][&broken], U256::ZERO);
        assert_eq!(balances[&BOB][&TOKEN], U256::ZERO);
        assert_eq!(chain.calls.count("eth_call"), 4);
        Ok(())
    }

    #[tokio::test]
    async fn test_balance_cache_memoizes() -> Result<()> {
        let chain = FakeChain::new(3);
        chain.pay(2, BOB, ALICE, 5);
        let cache = BalanceCache::new();

        let balance = cache.balance_at(chain.as_ref(), ALICE, 2).await?;
        assert_eq!(balance, U256::from(BASE_BALANCE + 5));
        cache.balance_at(chain.as_ref(), ALICE, 2).await?;
        assert_eq!(chain.calls.count("eth_getBalance"), 1);
        assert_eq!(cache.nonce_at(chain.as_ref(), BOB, 3).await?, 1);
        assert_eq!(cache.len(), 2);

        cache.clear();
        assert!(cache.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_first_range_targets_last_transactions() -> Result<()> {
        let chain = FakeChain::new(40);
        for number in 1..=40 {
            chain.pay(number, ALICE, BOB, 1);
        }
        let cache = BalanceCache::new();
        assert_eq!(find_first_range(chain.as_ref(), &cache, ALICE, 40).await?, 20);
        // Too few transactions to narrow anything.
        assert_eq!(find_first_range(chain.as_ref(), &cache, BOB, 40).await?, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_fetch_error_at_threshold() -> Result<()> {
        let chain = FakeChain::new(1);
        let feed = EventFeed::default();
        let mut events = feed.subscribe();
        let store = Arc::new(MemoryStore::new());
        let ctx = context(chain, store, feed, test_args(vec![ALICE]));

        ctx.report_failure(2, Some(7), &[ALICE]);
        ctx.report_failure(3, Some(7), &[ALICE]);
        ctx.report_failure(4, Some(7), &[ALICE]);

        assert_eq!(events.recv().await?, Event::new(EventType::FetchError, Some(7), vec![ALICE]));
        assert!(events.try_recv().is_err());
        Ok(())
    }

    #[test]
    fn test_running_set_rejects_duplicates() {
        let running = RunningSet::new();
        let claim = running.claim(ALICE, SyncOption::ETH);
        assert!(claim.is_ok());
        assert!(running.claim(ALICE, SyncOption::ERC20).is_ok());
        assert!(matches!(
            running.claim(ALICE, SyncOption::ETH),
            Err(EngineError::AlreadyRunning { address, option })
                if address == ALICE && option == SyncOption::ETH
        ));

        drop(claim);
        assert!(!running.is_running(ALICE, SyncOption::ETH));
        assert!(running.claim(ALICE, SyncOption::ETH).is_ok());
    }

    #[tokio::test]
    async fn test_reactor_lifecycle() -> Result<()> {
        let chain = FakeChain::new(31);
        chain.hide_after(30);
        chain.pay(5, BOB, ALICE, 10);
        chain.token_transfer(8, TOKEN, BOB, ALICE, 99);
        let store = Arc::new(SqliteStore::init("sqlite::memory:").await?);
        let args = test_args(vec![ALICE]);
        let reactor = Reactor::new(chain.clone(), store.clone(), EventFeed::default(), args);
        let mut events = reactor.subscribe();

        assert!(matches!(reactor.sync_history(BOB).await, Err(EngineError::ReactorNotRunning)));
        reactor.start()?;
        assert!(matches!(reactor.start(), Err(EngineError::AlreadyStarted)));
        assert_eq!(reactor.state(), ReactorState::Running);

        let ready = next_event(&mut events, |e| e.event_type == EventType::RecentHistoryReady);
        assert_eq!(ready.await?.block_number, Some(25));
        assert_eq!(store.get_transfers(ALICE, 0, None).await?.len(), 2);

        // A second backfill of the same account is rejected while the first runs.
        reactor.sync_history(BOB).await?;
        assert!(reactor.is_syncing_history(BOB));
        let duplicate = reactor.sync_history(BOB).await;
        assert!(matches!(
            duplicate,
            Err(EngineError::AlreadyRunning { address, .. }) if address == BOB
        ));

        // The head follower starts after the history target.
        next_event(&mut events, |e| e.block_number == Some(30)).await?;
        chain.pay(31, ALICE, BOB, 1);
        chain.reveal();
        let event = next_event(&mut events, |e| e.block_number == Some(31)).await?;
        assert_eq!(event, Event::new(EventType::NewBlock, Some(31), vec![ALICE]));

        reactor.stop().await?;
        assert_eq!(reactor.state(), ReactorState::Stopped);
        assert!(matches!(reactor.stop().await, Err(EngineError::ReactorNotRunning)));

        let transfers = store.get_transfers(ALICE, 0, None).await?;
        let blocks: Vec<u64> = transfers.iter().map(|t| t.block.number).collect();
        assert_eq!(blocks, vec![5, 8, 31]);
        let live = store.get_latest_synced(ALICE, SyncOption::LIVE).await?;
        assert_eq!(live.map(|h| h.number), Some(31));
        Ok(())
    }

    #[tokio::test]
    async fn test_restart_fills_blocks_missed_since_last_run() -> Result<()> {
        let chain = FakeChain::new(40);
        chain.pay(13, BOB, ALICE, 10);
        chain.token_transfer(20, TOKEN, BOB, ALICE, 99);
        let store = Arc::new(SqliteStore::init("sqlite::memory:").await?);
        // A previous run synced history to block 0 and followed the head up to 10.
        let both = SyncOption::ETH | SyncOption::ERC20;
        store.process_transfers(&[], &[ALICE], &[chain.header(0)], &[], both).await?;
        store.process_transfers(&[], &[ALICE], &[chain.header(10)], &[], SyncOption::ALL).await?;

        let args = test_args(vec![ALICE]);
        let reactor = Reactor::new(chain.clone(), store.clone(), EventFeed::default(), args);
        let mut events = reactor.subscribe();
        reactor.start()?;

        let ready = next_event(&mut events, |e| e.event_type == EventType::RecentHistoryReady);
        assert_eq!(ready.await?.block_number, Some(35));
        let transfers = store.get_transfers(ALICE, 0, None).await?;
        let blocks: Vec<u64> = transfers.iter().map(|t| t.block.number).collect();
        assert_eq!(blocks, vec![13, 20]);

        // The head follower picks up right after the target.
        next_event(&mut events, |e| e.block_number == Some(40)).await?;
        reactor.stop().await?;
        let live = store.get_latest_synced(ALICE, SyncOption::LIVE).await?;
        assert_eq!(live.map(|h| h.number), Some(40));
        Ok(())
    }
}
