use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use ringtone_types::catalog::{
    CatalogPayload, InstantCatalogPayload, InstantPrizeRecord, PrizeId, RewardType, RewardValue,
    WheelCatalogPayload, WheelSegmentRecord,
};
use ringtone_types::draw::{resolve_instant, resolve_wheel, ZeroCapPolicy};
use ringtone_types::events::{EventIds, ServerEvent};
use ringtone_types::session::{
    CompleteSessionRequest, CompleteSessionResponse, CreateOrderRequest, CreateOrderResponse,
    DrawWinnerResponse, PrizeSummary, SpinResponse, StartSessionResponse,
};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info};
use uuid::Uuid;

use crate::ApiError;

/// Tiles on one scratch card.
pub const TILE_COUNT: usize = 9;
/// Distinct tile symbols.
pub const SYMBOL_COUNT: u32 = 6;
/// Matching tiles that reveal a win.
pub const MATCH_COUNT: usize = 3;

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Wallet {
    pub cash: f64,
    pub points: f64,
}

impl Wallet {
    /// Adds a cash or points reward; returns whether the balance changed.
    fn credit(&mut self, prize: &PrizeSummary) -> bool {
        let Some(amount) = prize.value.as_number() else {
            return false;
        };
        match prize.reward_type {
            RewardType::Cash => self.cash += amount,
            RewardType::Points => self.points += amount,
            RewardType::Prize | RewardType::Lose => return false,
        }
        true
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Competition {
    pub instant: Option<InstantCatalogPayload>,
    pub wheel: Option<WheelCatalogPayload>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Order {
    pub competition_id: String,
    pub user_id: String,
    pub paid: bool,
    pub cards_total: u32,
    pub cards_played: u32,
}

impl Order {
    pub fn cards_remaining(&self) -> u32 {
        self.cards_total.saturating_sub(self.cards_played)
    }
}

#[derive(Clone, Debug, PartialEq)]
struct Session {
    order_id: String,
    is_winner: bool,
    prize_id: Option<PrizeId>,
    prize: PrizeSummary,
    prize_label: Option<String>,
    completed: bool,
}

/// Everything the service knows. Events raised by an operation queue in an outbox until drained.
pub struct State {
    policy: ZeroCapPolicy,
    rng: StdRng,
    competitions: BTreeMap<String, Competition>,
    orders: BTreeMap<String, Order>,
    sessions: BTreeMap<String, Session>,
    wallets: BTreeMap<String, Wallet>,
    // (competition id, user id) -> spins used
    spins: BTreeMap<(String, String), u32>,
    outbox: Vec<ServerEvent>,
}

impl State {
    pub fn new(seed: Option<u64>, policy: ZeroCapPolicy) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            policy,
            rng,
            competitions: BTreeMap::new(),
            orders: BTreeMap::new(),
            sessions: BTreeMap::new(),
            wallets: BTreeMap::new(),
            spins: BTreeMap::new(),
            outbox: Vec::new(),
        }
    }

    pub fn competition(&self, competition_id: &str) -> Option<&Competition> {
        self.competitions.get(competition_id)
    }

    pub fn order(&self, order_id: &str) -> Option<&Order> {
        self.orders.get(order_id)
    }

    pub fn wallet(&self, user_id: &str) -> Wallet {
        self.wallets.get(user_id).cloned().unwrap_or_default()
    }

    pub(crate) fn drain_events(&mut self) -> Vec<ServerEvent> {
        std::mem::take(&mut self.outbox)
    }

    pub fn create_order(
        &mut self,
        request: &CreateOrderRequest,
        paid: bool,
    ) -> Result<CreateOrderResponse, ApiError> {
        if request.cards == 0 {
            return Err(ApiError::bad_request("Order must include at least one card"));
        }
        if !self.competitions.contains_key(&request.competition_id) {
            return Err(ApiError::not_found("Competition not found"));
        }
        let order_id = Uuid::new_v4().to_string();
        self.orders.insert(
            order_id.clone(),
            Order {
                competition_id: request.competition_id.clone(),
                user_id: request.user_id.clone(),
                paid,
                cards_total: request.cards,
                cards_played: 0,
            },
        );
        debug!(order_id = %order_id, cards = request.cards, paid, "order created");
        self.outbox.push(ServerEvent::OrderUpdated(
            EventIds::order(order_id.clone()).with_user(request.user_id.clone()),
        ));
        Ok(CreateOrderResponse { order_id })
    }

    /// Locks in the outcome of one scratch card and consumes it from the order.
    ///
    /// A winning prize's supply is reserved here, not at completion, so concurrent sessions cannot
    /// both be promised the last unit.
    pub fn start_session(&mut self, order_id: &str) -> Result<StartSessionResponse, ApiError> {
        let order = self
            .orders
            .get_mut(order_id)
            .ok_or_else(|| ApiError::not_found("Order not found"))?;
        if !order.paid {
            return Err(ApiError::payment_required("Order is not paid"));
        }
        if order.cards_remaining() == 0 {
            return Err(ApiError::conflict(
                "No scratch cards remaining on this order",
            ));
        }
        let catalog = self
            .competitions
            .get_mut(&order.competition_id)
            .and_then(|competition| competition.instant.as_mut())
            .filter(|catalog| !catalog.prizes.is_empty())
            .ok_or_else(|| ApiError::not_found("Competition has no instant prizes configured"))?;

        let awarded = resolve_instant(&catalog.prizes, self.policy, &mut self.rng)
            .map(|index| &mut catalog.prizes[index])
            .filter(|prize| prize.reward_type.is_winning());
        let (prize_id, prize, prize_label) = match awarded {
            Some(prize) => {
                prize.quantity_won += 1;
                (
                    Some(prize.id.clone()),
                    PrizeSummary {
                        reward_type: prize.reward_type,
                        value: prize.reward_value.clone(),
                    },
                    Some(prize.label.clone()),
                )
            }
            None => (None, PrizeSummary::losing(), None),
        };
        let is_winner = prize_id.is_some();
        order.cards_played += 1;

        let tile_layout = tile_layout(is_winner, &mut self.rng);
        let session_id = Uuid::new_v4().to_string();
        self.sessions.insert(
            session_id.clone(),
            Session {
                order_id: order_id.to_string(),
                is_winner,
                prize_id: prize_id.clone(),
                prize: prize.clone(),
                prize_label,
                completed: false,
            },
        );
        info!(order_id, session_id = %session_id, is_winner, "scratch session started");

        Ok(StartSessionResponse {
            success: true,
            session_id,
            is_winner,
            prize,
            tile_layout,
            prize_id,
        })
    }

    /// Credits the outcome locked in at start. A session completes at most once.
    pub fn complete_session(
        &mut self,
        session_id: &str,
        request: &CompleteSessionRequest,
    ) -> Result<CompleteSessionResponse, ApiError> {
        let session = self
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| ApiError::not_found("Session not found"))?;
        if session.completed {
            return Err(ApiError::conflict("Session already completed"));
        }
        if session.order_id != request.order_id {
            return Err(ApiError::bad_request("Session does not belong to this order"));
        }
        if session.is_winner != request.is_winner || session.prize_id != request.prize_id {
            return Err(ApiError::bad_request("Session outcome does not match"));
        }
        let order = self
            .orders
            .get(&session.order_id)
            .ok_or_else(|| ApiError::not_found("Order not found"))?;

        session.completed = true;
        let credited = session.is_winner
            && self
                .wallets
                .entry(order.user_id.clone())
                .or_default()
                .credit(&session.prize);

        let ids = EventIds::order(session.order_id.clone()).with_user(order.user_id.clone());
        self.outbox.push(ServerEvent::OrderUpdated(ids.clone()));
        if session.is_winner {
            self.outbox.push(ServerEvent::TransactionUpdated(ids));
        }
        if credited {
            self.outbox
                .push(ServerEvent::WalletUpdated(EventIds::user(order.user_id.clone())));
        }
        info!(
            session_id,
            order_id = %session.order_id,
            is_winner = session.is_winner,
            credited,
            "scratch session completed"
        );

        Ok(CompleteSessionResponse {
            success: true,
            prize: session.prize.clone(),
            prize_label: session.prize_label.clone(),
            remaining_cards: order.cards_remaining(),
            order_id: session.order_id.clone(),
        })
    }

    /// Replaces one of a competition's catalogs. Last write wins.
    ///
    /// Consumed counters are server-owned: entries whose id survives keep theirs, new entries
    /// start at zero, whatever the payload says.
    pub fn save_catalog(
        &mut self,
        competition_id: &str,
        payload: CatalogPayload,
    ) -> Result<(), ApiError> {
        payload
            .validate()
            .map_err(|err| ApiError::bad_request(err.to_string()))?;

        let is_new = !self.competitions.contains_key(competition_id);
        let competition = self
            .competitions
            .entry(competition_id.to_string())
            .or_default();
        let ids = EventIds::competition(competition_id);
        let event = match payload {
            CatalogPayload::Instant(mut incoming) => {
                let previous = competition.instant.take().unwrap_or_default();
                for prize in &mut incoming.prizes {
                    prize.quantity_won = previous
                        .prizes
                        .iter()
                        .find(|old| old.id == prize.id)
                        .map_or(0, |old| old.quantity_won);
                }
                info!(competition_id, prizes = incoming.prizes.len(), "instant catalog saved");
                competition.instant = Some(incoming);
                if is_new {
                    ServerEvent::CompetitionCreated(ids)
                } else {
                    ServerEvent::CompetitionUpdated(ids)
                }
            }
            CatalogPayload::Spin(mut incoming) => {
                let previous = competition.wheel.take();
                let segments = previous
                    .as_ref()
                    .map(|wheel| wheel.segments.as_slice())
                    .unwrap_or_default();
                for segment in &mut incoming.segments {
                    segment.current_wins = segments
                        .iter()
                        .find(|old| old.id == segment.id)
                        .map_or(0, |old| old.current_wins);
                }
                info!(
                    competition_id,
                    segments = incoming.segments.len(),
                    max_spins_per_user = ?incoming.max_spins_per_user,
                    "wheel catalog saved"
                );
                competition.wheel = Some(incoming);
                if previous.is_none() {
                    ServerEvent::SpinCreated(ids)
                } else {
                    ServerEvent::SpinUpdated(ids)
                }
            }
        };
        self.outbox.push(event);
        Ok(())
    }

    /// Spins a competition's wheel for the order's owner.
    pub fn spin(&mut self, competition_id: &str, order_id: &str) -> Result<SpinResponse, ApiError> {
        let order = self
            .orders
            .get(order_id)
            .ok_or_else(|| ApiError::not_found("Order not found"))?;
        if !order.paid {
            return Err(ApiError::payment_required("Order is not paid"));
        }
        if order.competition_id != competition_id {
            return Err(ApiError::bad_request(
                "Order does not belong to this competition",
            ));
        }
        let wheel = self
            .competitions
            .get_mut(competition_id)
            .and_then(|competition| competition.wheel.as_mut())
            .ok_or_else(|| ApiError::not_found("Competition has no spin wheel configured"))?;
        let used = self
            .spins
            .entry((competition_id.to_string(), order.user_id.clone()))
            .or_default();
        if let Some(max) = wheel.max_spins_per_user {
            if *used >= max {
                return Err(ApiError::conflict("Spin limit reached"));
            }
        }
        *used += 1;
        let spins_remaining = wheel
            .max_spins_per_user
            .map(|max| max.saturating_sub(*used));

        let landed = resolve_wheel(&wheel.segments, self.policy, &mut self.rng)
            .map(|index| &mut wheel.segments[index]);
        let (segment_id, label, prize) = match landed {
            Some(segment) => {
                segment.current_wins += 1;
                let prize = if segment.reward_type.is_winning() {
                    PrizeSummary {
                        reward_type: segment.reward_type,
                        value: segment.reward_value.clone(),
                    }
                } else {
                    PrizeSummary::losing()
                };
                (Some(segment.id.clone()), Some(segment.label.clone()), prize)
            }
            None => (None, None, PrizeSummary::losing()),
        };
        let credited = self
            .wallets
            .entry(order.user_id.clone())
            .or_default()
            .credit(&prize);

        self.outbox.push(ServerEvent::SpinUpdated(
            EventIds::competition(competition_id).with_user(order.user_id.clone()),
        ));
        if credited {
            self.outbox
                .push(ServerEvent::WalletUpdated(EventIds::user(order.user_id.clone())));
        }
        info!(competition_id, order_id, segment = ?segment_id, "wheel spun");

        Ok(SpinResponse {
            success: true,
            segment_id,
            label,
            prize,
            spins_remaining,
        })
    }

    /// Picks a winning order uniformly among the competition's paid orders.
    pub fn draw_winner(&mut self, competition_id: &str) -> Result<DrawWinnerResponse, ApiError> {
        if !self.competitions.contains_key(competition_id) {
            return Err(ApiError::not_found("Competition not found"));
        }
        let entries: Vec<(&String, &Order)> = self
            .orders
            .iter()
            .filter(|(_, order)| order.paid && order.competition_id == competition_id)
            .collect();
        let &(order_id, order) = entries
            .choose(&mut self.rng)
            .ok_or_else(|| ApiError::conflict("Competition has no paid entries"))?;
        let response = DrawWinnerResponse {
            competition_id: competition_id.to_string(),
            order_id: order_id.clone(),
            user_id: order.user_id.clone(),
        };
        info!(
            competition_id,
            entries = entries.len(),
            order_id = %response.order_id,
            "winner drawn"
        );

        self.outbox.push(ServerEvent::WinnerDrawn(
            EventIds::competition(competition_id)
                .with_order(response.order_id.clone())
                .with_user(response.user_id.clone()),
        ));
        Ok(response)
    }

    /// Seeds a competition with a small instant catalog and an evenly weighted wheel.
    pub fn seed_demo(&mut self, competition_id: &str) -> Result<(), ApiError> {
        self.save_catalog(competition_id, demo_instant().into())?;
        self.save_catalog(competition_id, demo_wheel().into())
    }
}

/// Lays out the tiles of one card.
///
/// A winner shows exactly one symbol [MATCH_COUNT] times. Every other symbol appears at most
/// twice, so a loser never shows a match.
pub fn tile_layout<R: Rng>(is_winner: bool, rng: &mut R) -> Vec<u32> {
    let winning = is_winner.then(|| rng.gen_range(0..SYMBOL_COUNT));
    let mut fillers: Vec<u32> = (0..SYMBOL_COUNT)
        .filter(|symbol| Some(*symbol) != winning)
        .flat_map(|symbol| [symbol; MATCH_COUNT - 1])
        .collect();
    fillers.shuffle(rng);

    let mut tiles = winning.map_or_else(Vec::new, |symbol| vec![symbol; MATCH_COUNT]);
    let needed = TILE_COUNT - tiles.len();
    tiles.extend(fillers.into_iter().take(needed));
    tiles.shuffle(rng);
    tiles
}

fn demo_instant() -> InstantCatalogPayload {
    let prize = |id: &str, label: &str, reward_type, reward_value, odds, cap| InstantPrizeRecord {
        id: PrizeId::from(id),
        label: label.to_string(),
        reward_type,
        reward_value,
        odds,
        quantity_available: cap,
        quantity_won: 0,
    };
    InstantCatalogPayload {
        prizes: vec![
            prize(
                "demo-jackpot",
                "Signed guitar",
                RewardType::Prize,
                RewardValue::Text("Signed guitar".to_string()),
                0.01,
                Some(1),
            ),
            prize(
                "demo-cash",
                "£10 cash",
                RewardType::Cash,
                RewardValue::Number(10.0),
                0.1,
                Some(50),
            ),
            prize(
                "demo-points",
                "100 points",
                RewardType::Points,
                RewardValue::Number(100.0),
                0.25,
                None,
            ),
        ],
    }
}

fn demo_wheel() -> WheelCatalogPayload {
    let segment = |id: &str, label: &str, reward_type, reward_value, probability| {
        WheelSegmentRecord {
            id: PrizeId::from(id),
            label: label.to_string(),
            reward_type,
            reward_value,
            probability,
            max_wins: None,
            current_wins: 0,
        }
    };
    WheelCatalogPayload {
        max_spins_per_user: Some(3),
        segments: vec![
            segment("wheel-cash", "£5 cash", RewardType::Cash, RewardValue::Number(5.0), 10.0),
            segment(
                "wheel-points",
                "50 points",
                RewardType::Points,
                RewardValue::Number(50.0),
                40.0,
            ),
            segment(
                "wheel-lose",
                "Try again",
                RewardType::Lose,
                RewardValue::Number(0.0),
                50.0,
            ),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use std::collections::HashMap;

    const COMPETITION: &str = "comp-1";

    fn instant(prizes: Vec<InstantPrizeRecord>) -> CatalogPayload {
        InstantCatalogPayload { prizes }.into()
    }

    fn cash_prize(id: &str, value: f64, odds: f64, cap: Option<u64>) -> InstantPrizeRecord {
        InstantPrizeRecord {
            id: PrizeId::from(id),
            label: format!("£{value} cash"),
            reward_type: RewardType::Cash,
            reward_value: RewardValue::Number(value),
            odds,
            quantity_available: cap,
            quantity_won: 0,
        }
    }

    fn wheel_segment(id: &str, reward_type: RewardType, probability: f64) -> WheelSegmentRecord {
        WheelSegmentRecord {
            id: PrizeId::from(id),
            label: id.to_string(),
            reward_type,
            reward_value: RewardValue::Number(5.0),
            probability,
            max_wins: None,
            current_wins: 0,
        }
    }

    fn state_with(prizes: Vec<InstantPrizeRecord>) -> State {
        let mut state = State::new(Some(7), ZeroCapPolicy::Disabled);
        state.save_catalog(COMPETITION, instant(prizes)).unwrap();
        state.drain_events();
        state
    }

    fn order(state: &mut State, user: &str, cards: u32) -> String {
        let request = CreateOrderRequest {
            competition_id: COMPETITION.to_string(),
            user_id: user.to_string(),
            cards,
        };
        let order_id = state.create_order(&request, true).unwrap().order_id;
        state.drain_events();
        order_id
    }

    fn play(state: &mut State, order_id: &str) -> (StartSessionResponse, CompleteSessionResponse) {
        let start = state.start_session(order_id).unwrap();
        let request = CompleteSessionRequest::for_start(order_id, &start);
        let complete = state.complete_session(&start.session_id, &request).unwrap();
        (start, complete)
    }

    fn counts(tiles: &[u32]) -> HashMap<u32, usize> {
        let mut counts = HashMap::new();
        for tile in tiles {
            *counts.entry(*tile).or_default() += 1;
        }
        counts
    }

    #[test]
    fn test_winning_session_credits_wallet() {
        let mut state = state_with(vec![cash_prize("p1", 25.0, 1.0, None)]);
        let order_id = order(&mut state, "user-1", 2);

        let (start, complete) = play(&mut state, &order_id);
        assert!(start.success);
        assert!(start.is_winner);
        assert_eq!(start.prize_id, Some(PrizeId::from("p1")));
        assert_eq!(start.prize.value, RewardValue::Number(25.0));
        assert_eq!(complete.remaining_cards, 1);
        assert_eq!(complete.prize_label.as_deref(), Some("£25 cash"));
        assert_eq!(state.wallet("user-1").cash, 25.0);

        let tags: Vec<_> = state.drain_events().iter().map(|event| event.tag()).collect();
        assert_eq!(
            tags,
            vec!["order_updated", "transaction_updated", "wallet_updated"]
        );
    }

    #[test]
    fn test_losing_session_credits_nothing() {
        let mut state = state_with(vec![cash_prize("p1", 25.0, 0.0, None)]);
        let order_id = order(&mut state, "user-1", 1);

        let (start, complete) = play(&mut state, &order_id);
        assert!(!start.is_winner);
        assert_eq!(start.prize_id, None);
        assert_eq!(start.prize, PrizeSummary::losing());
        assert_eq!(complete.remaining_cards, 0);
        assert_eq!(state.wallet("user-1"), Wallet::default());

        let tags: Vec<_> = state.drain_events().iter().map(|event| event.tag()).collect();
        assert_eq!(tags, vec!["order_updated"]);
    }

    #[test]
    fn test_first_hit_in_list_order_wins() {
        let mut state = state_with(vec![
            cash_prize("first", 1.0, 1.0, None),
            cash_prize("second", 2.0, 1.0, None),
        ]);
        let order_id = order(&mut state, "user-1", 5);
        for _ in 0..5 {
            let start = state.start_session(&order_id).unwrap();
            assert_eq!(start.prize_id, Some(PrizeId::from("first")));
        }
    }

    #[test]
    fn test_supply_reserved_at_start() {
        let mut state = state_with(vec![cash_prize("p1", 10.0, 1.0, Some(1))]);
        let order_id = order(&mut state, "user-1", 2);

        // The first session is started but never completed; the unit is still gone.
        let first = state.start_session(&order_id).unwrap();
        assert!(first.is_winner);
        let second = state.start_session(&order_id).unwrap();
        assert!(!second.is_winner);

        let catalog = state.competition(COMPETITION).unwrap().instant.as_ref().unwrap();
        assert_eq!(catalog.prizes[0].quantity_won, 1);
    }

    #[test]
    fn test_zero_cap_policy() {
        let mut state = state_with(vec![cash_prize("p1", 10.0, 1.0, Some(0))]);
        let order_id = order(&mut state, "user-1", 1);
        assert!(!state.start_session(&order_id).unwrap().is_winner);

        let mut state = State::new(Some(7), ZeroCapPolicy::Unlimited);
        state
            .save_catalog(COMPETITION, instant(vec![cash_prize("p1", 10.0, 1.0, Some(0))]))
            .unwrap();
        let order_id = order(&mut state, "user-1", 3);
        for _ in 0..3 {
            assert!(state.start_session(&order_id).unwrap().is_winner);
        }
    }

    #[test]
    fn test_start_rejections() {
        let mut state = state_with(vec![cash_prize("p1", 10.0, 0.5, None)]);

        let err = state.start_session("missing").unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.message(), "Order not found");

        let unpaid = state
            .create_order(
                &CreateOrderRequest {
                    competition_id: COMPETITION.to_string(),
                    user_id: "user-1".to_string(),
                    cards: 1,
                },
                false,
            )
            .unwrap()
            .order_id;
        let err = state.start_session(&unpaid).unwrap_err();
        assert_eq!(err.status(), StatusCode::PAYMENT_REQUIRED);
        assert_eq!(err.message(), "Order is not paid");

        let order_id = order(&mut state, "user-1", 1);
        state.start_session(&order_id).unwrap();
        let err = state.start_session(&order_id).unwrap_err();
        assert_eq!(err.status(), StatusCode::CONFLICT);
        assert_eq!(err.message(), "No scratch cards remaining on this order");
    }

    #[test]
    fn test_start_without_instant_prizes() {
        let mut state = State::new(Some(7), ZeroCapPolicy::Disabled);
        state
            .save_catalog(
                COMPETITION,
                WheelCatalogPayload {
                    max_spins_per_user: None,
                    segments: vec![
                        wheel_segment("a", RewardType::Cash, 50.0),
                        wheel_segment("b", RewardType::Lose, 50.0),
                    ],
                }
                .into(),
            )
            .unwrap();
        let order_id = order(&mut state, "user-1", 1);

        let err = state.start_session(&order_id).unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.message(), "Competition has no instant prizes configured");
        assert_eq!(state.order(&order_id).unwrap().cards_played, 0);
    }

    #[test]
    fn test_duplicate_complete_never_credits_twice() {
        let mut state = state_with(vec![cash_prize("p1", 25.0, 1.0, None)]);
        let order_id = order(&mut state, "user-1", 1);
        let start = state.start_session(&order_id).unwrap();
        let request = CompleteSessionRequest::for_start(order_id.clone(), &start);

        state.complete_session(&start.session_id, &request).unwrap();
        state.drain_events();
        let err = state
            .complete_session(&start.session_id, &request)
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::CONFLICT);
        assert_eq!(err.message(), "Session already completed");
        assert_eq!(state.wallet("user-1").cash, 25.0);
        assert!(state.drain_events().is_empty());
    }

    #[test]
    fn test_complete_rejects_mismatch() {
        let mut state = state_with(vec![cash_prize("p1", 25.0, 1.0, None)]);
        let order_id = order(&mut state, "user-1", 1);
        let start = state.start_session(&order_id).unwrap();

        let err = state
            .complete_session("missing", &CompleteSessionRequest::for_start(order_id.clone(), &start))
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.message(), "Session not found");

        let wrong_order = CompleteSessionRequest::for_start("other", &start);
        let err = state
            .complete_session(&start.session_id, &wrong_order)
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);

        let mut forged = CompleteSessionRequest::for_start(order_id.clone(), &start);
        forged.prize_id = Some(PrizeId::from("p2"));
        let err = state.complete_session(&start.session_id, &forged).unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.message(), "Session outcome does not match");

        // Rejected attempts leave the session completable.
        let request = CompleteSessionRequest::for_start(order_id, &start);
        state.complete_session(&start.session_id, &request).unwrap();
        assert_eq!(state.wallet("user-1").cash, 25.0);
    }

    #[test]
    fn test_tile_layout_reveals_only_winners() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..200 {
            let tiles = tile_layout(true, &mut rng);
            assert_eq!(tiles.len(), TILE_COUNT);
            let tally = counts(&tiles);
            assert_eq!(tally.values().filter(|count| **count >= MATCH_COUNT).count(), 1);
            assert!(tally.values().all(|count| *count <= MATCH_COUNT));

            let tiles = tile_layout(false, &mut rng);
            assert_eq!(tiles.len(), TILE_COUNT);
            assert!(counts(&tiles).values().all(|count| *count < MATCH_COUNT));
            assert!(tiles.iter().all(|tile| *tile < SYMBOL_COUNT));
        }
    }

    #[test]
    fn test_save_preserves_surviving_counters() {
        let mut state = state_with(vec![
            cash_prize("keep", 10.0, 1.0, Some(5)),
            cash_prize("drop", 5.0, 0.0, None),
        ]);
        let order_id = order(&mut state, "user-1", 2);
        play(&mut state, &order_id);
        play(&mut state, &order_id);

        let mut replaced = cash_prize("keep", 20.0, 0.5, Some(10));
        replaced.quantity_won = 99;
        let mut added = cash_prize("new", 1.0, 0.1, None);
        added.quantity_won = 7;
        state
            .save_catalog(COMPETITION, instant(vec![replaced, added]))
            .unwrap();

        let catalog = state.competition(COMPETITION).unwrap().instant.as_ref().unwrap();
        assert_eq!(catalog.prizes.len(), 2);
        assert_eq!(catalog.prizes[0].quantity_won, 2);
        assert_eq!(catalog.prizes[0].reward_value, RewardValue::Number(20.0));
        assert_eq!(catalog.prizes[1].quantity_won, 0);
        assert!(matches!(
            state.drain_events().last(),
            Some(ServerEvent::CompetitionUpdated(_))
        ));
    }

    #[test]
    fn test_save_rejects_invalid_catalog() {
        let mut state = State::new(None, ZeroCapPolicy::Disabled);
        let wheel = WheelCatalogPayload {
            max_spins_per_user: None,
            segments: vec![
                wheel_segment("a", RewardType::Cash, 10.0),
                wheel_segment("b", RewardType::Cash, 20.0),
                wheel_segment("c", RewardType::Lose, 69.0),
            ],
        };
        let err = state.save_catalog(COMPETITION, wheel.into()).unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            err.message(),
            "Total probability must equal 100% (currently 99%)"
        );
        assert!(state.competition(COMPETITION).is_none());
        assert!(state.drain_events().is_empty());
    }

    #[test]
    fn test_save_events() {
        let mut state = State::new(None, ZeroCapPolicy::Disabled);
        let prizes = || instant(vec![cash_prize("p1", 10.0, 0.1, None)]);
        let wheel = || {
            CatalogPayload::from(WheelCatalogPayload {
                max_spins_per_user: None,
                segments: vec![
                    wheel_segment("a", RewardType::Cash, 50.0),
                    wheel_segment("b", RewardType::Lose, 50.0),
                ],
            })
        };
        state.save_catalog(COMPETITION, prizes()).unwrap();
        state.save_catalog(COMPETITION, prizes()).unwrap();
        state.save_catalog(COMPETITION, wheel()).unwrap();
        state.save_catalog(COMPETITION, wheel()).unwrap();

        let tags: Vec<_> = state.drain_events().iter().map(|event| event.tag()).collect();
        assert_eq!(
            tags,
            vec![
                "competition_created",
                "competition_updated",
                "spin_created",
                "spin_updated"
            ]
        );
    }

    #[test]
    fn test_spin_limit() {
        let mut state = State::new(Some(3), ZeroCapPolicy::Disabled);
        state
            .save_catalog(
                COMPETITION,
                WheelCatalogPayload {
                    max_spins_per_user: Some(2),
                    segments: vec![
                        wheel_segment("cash", RewardType::Cash, 100.0),
                        wheel_segment("never", RewardType::Lose, 0.0),
                    ],
                }
                .into(),
            )
            .unwrap();
        let order_id = order(&mut state, "user-1", 1);

        let first = state.spin(COMPETITION, &order_id).unwrap();
        assert_eq!(first.segment_id, Some(PrizeId::from("cash")));
        assert_eq!(first.spins_remaining, Some(1));
        let second = state.spin(COMPETITION, &order_id).unwrap();
        assert_eq!(second.spins_remaining, Some(0));

        let err = state.spin(COMPETITION, &order_id).unwrap_err();
        assert_eq!(err.status(), StatusCode::CONFLICT);
        assert_eq!(err.message(), "Spin limit reached");
        assert_eq!(state.wallet("user-1").cash, 10.0);

        // The limit is per user, not per order.
        let other = order(&mut state, "user-1", 1);
        assert!(state.spin(COMPETITION, &other).is_err());
        let someone_else = order(&mut state, "user-2", 1);
        assert!(state.spin(COMPETITION, &someone_else).is_ok());
    }

    #[test]
    fn test_spin_skips_exhausted_segments() {
        let mut state = State::new(Some(11), ZeroCapPolicy::Disabled);
        let mut capped = wheel_segment("capped", RewardType::Cash, 90.0);
        capped.max_wins = Some(1);
        state
            .save_catalog(
                COMPETITION,
                WheelCatalogPayload {
                    max_spins_per_user: None,
                    segments: vec![capped, wheel_segment("rest", RewardType::Points, 10.0)],
                }
                .into(),
            )
            .unwrap();
        let order_id = order(&mut state, "user-1", 1);

        let landed: Vec<_> = (0..20)
            .map(|_| state.spin(COMPETITION, &order_id).unwrap().segment_id)
            .collect();
        let capped_hits = landed
            .iter()
            .filter(|id| id.as_ref().map(PrizeId::as_str) == Some("capped"))
            .count();
        assert!(capped_hits <= 1);
        assert_eq!(
            landed.last().unwrap().as_ref().map(PrizeId::as_str),
            Some("rest")
        );
    }

    #[test]
    fn test_spin_rejects_foreign_order() {
        let mut state = state_with(vec![cash_prize("p1", 10.0, 0.1, None)]);
        state.seed_demo("other").unwrap();
        let order_id = order(&mut state, "user-1", 1);

        let err = state.spin("other", &order_id).unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        let err = state.spin(COMPETITION, &order_id).unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.message(), "Competition has no spin wheel configured");
    }

    #[test]
    fn test_draw_winner() {
        let mut state = state_with(vec![cash_prize("p1", 10.0, 0.1, None)]);
        let err = state.draw_winner(COMPETITION).unwrap_err();
        assert_eq!(err.status(), StatusCode::CONFLICT);
        assert_eq!(
            state.draw_winner("missing").unwrap_err().status(),
            StatusCode::NOT_FOUND
        );

        let first = order(&mut state, "user-1", 1);
        let second = order(&mut state, "user-2", 1);
        let drawn = state.draw_winner(COMPETITION).unwrap();
        assert!(drawn.order_id == first || drawn.order_id == second);
        assert_eq!(
            state.order(&drawn.order_id).unwrap().user_id,
            drawn.user_id
        );
        assert!(matches!(
            state.drain_events().as_slice(),
            [ServerEvent::WinnerDrawn(ids)] if ids.order_id.is_some() && ids.user_id.is_some()
        ));
    }

    #[test]
    fn test_create_order_rejections() {
        let mut state = state_with(vec![cash_prize("p1", 10.0, 0.1, None)]);
        let request = |competition: &str, cards| CreateOrderRequest {
            competition_id: competition.to_string(),
            user_id: "user-1".to_string(),
            cards,
        };
        assert_eq!(
            state.create_order(&request(COMPETITION, 0), true).unwrap_err().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            state.create_order(&request("missing", 1), true).unwrap_err().status(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_seeded_runs_repeat() {
        let outcomes = |seed| {
            let mut state = State::new(Some(seed), ZeroCapPolicy::Disabled);
            state.seed_demo(COMPETITION).unwrap();
            let order_id = order(&mut state, "user-1", 20);
            (0..20)
                .map(|_| {
                    let start = state.start_session(&order_id).unwrap();
                    (start.prize_id, start.tile_layout)
                })
                .collect::<Vec<_>>()
        };
        assert_eq!(outcomes(5), outcomes(5));
    }
}
