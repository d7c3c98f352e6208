//! The fixed-tick pipeline: input, timers, movement against terrain,
//! overlap contacts, state transitions and deferred bookkeeping, in that
//! order.

use miego_engine::{
    apply_gravity, clamp_step_seconds, detect_overlaps, move_and_collide, Contact, ContactKey,
    ContactProbe, EntityId, InputSnapshot, SceneCommand, SceneWorld, Vec2,
};
use tracing::{debug, info};

use crate::collision::{classify_terrain, direction_away, is_hazard, is_stomp, TerrainContact};
use crate::config::GameConfig;
use crate::entity::{
    BlockHitOutcome, DamageOutcome, DeathCause, DeathStyle, EnemyKind, EnemyState, Entity,
    EntityKind, EntityTag, Item, ItemKind, Projectile, ProjectileKind, Release, ShotKind,
    StompOutcome, TerrainOutcome, Trigger,
};
use crate::events::{GameEvent, GameEventBus};
use crate::game_state::GameState;

use super::{LevelSession, SessionError, SessionPhase};

/// State shared with the scene that outlives a single level.
pub(super) struct TickContext<'a> {
    pub config: &'a GameConfig,
    pub game: &'a mut GameState,
    pub events: &'a mut GameEventBus,
}

/// An enemy taken out by something other than the player.
struct Strike {
    kind: EnemyKind,
    position: Vec2,
    consumes_attacker: bool,
}

impl LevelSession {
    pub(super) fn tick(
        &mut self,
        dt_seconds: f32,
        input: &InputSnapshot,
        ctx: &mut TickContext<'_>,
        world: &mut SceneWorld<Entity>,
    ) -> Result<SceneCommand, SessionError> {
        if input.pause_pressed() && self.phase != SessionPhase::GameOver {
            self.paused = !self.paused;
            info!(paused = self.paused, "pause_toggled");
        }
        if self.paused {
            return Ok(SceneCommand::None);
        }
        let dt = clamp_step_seconds(dt_seconds);
        self.ticks += 1;
        self.clock += f64::from(dt);
        let input = self.gate_input(input, dt);

        if let Some(command) = self.advance_phase(dt, &input, ctx)? {
            return Ok(command);
        }
        self.player.tick_timers(dt);
        self.steer_player(dt, &input, ctx, world)?;
        self.update_entities(dt, ctx, world)?;
        self.move_player(dt, ctx, world)?;
        self.move_entities(dt, ctx, world);
        self.resolve_overlaps(ctx, world);
        self.enforce_bounds(ctx, world);
        if !self.player.is_dead() {
            self.camera
                .update(self.player.body.position.x, self.player.facing().sign(), dt);
        }
        self.flush_removed_solids();
        Ok(SceneCommand::None)
    }

    /// Swallows input for a short while after a load or respawn.
    fn gate_input(&mut self, input: &InputSnapshot, dt: f32) -> InputSnapshot {
        if self.input_lockout > 0.0 {
            self.input_lockout = (self.input_lockout - dt).max(0.0);
            return InputSnapshot::empty();
        }
        *input
    }

    /// Runs the level timer and the phase countdowns. `Some` short-circuits
    /// the rest of the tick.
    fn advance_phase(
        &mut self,
        dt: f32,
        input: &InputSnapshot,
        ctx: &mut TickContext<'_>,
    ) -> Result<Option<SceneCommand>, SessionError> {
        match self.phase {
            SessionPhase::Playing => {
                if !self.player.is_dead() && ctx.game.update_time(dt) {
                    ctx.events.emit(GameEvent::TimeExpired);
                    if self.player.kill(DeathCause::TimeExpired) {
                        self.on_player_died(DeathCause::TimeExpired, ctx);
                    }
                }
                Ok(None)
            }
            SessionPhase::Dying { remaining } => {
                let remaining = remaining - dt;
                if remaining > 0.0 {
                    self.phase = SessionPhase::Dying { remaining };
                } else if ctx.game.is_game_over() {
                    self.phase = SessionPhase::GameOver;
                    ctx.events.emit(GameEvent::GameOver {
                        score: ctx.game.score(),
                    });
                } else {
                    self.respawn(ctx)?;
                }
                Ok(None)
            }
            SessionPhase::LevelComplete { remaining } => {
                let remaining = remaining - dt;
                if remaining > 0.0 {
                    self.phase = SessionPhase::LevelComplete { remaining };
                    return Ok(None);
                }
                let next = ctx.game.level() + 1;
                ctx.game.start_level(next);
                info!(level = next, "level_advance");
                Ok(Some(SceneCommand::HardReset))
            }
            SessionPhase::GameOver => {
                if input.jump_pressed() {
                    ctx.game.reset_for_new_game();
                    info!("new_game_started");
                    return Ok(Some(SceneCommand::HardReset));
                }
                Ok(Some(SceneCommand::None))
            }
        }
    }

    fn respawn(&mut self, ctx: &mut TickContext<'_>) -> Result<(), SessionError> {
        let feet = self.level.cell_floor(self.level.player_spawn(), self.tile_size);
        self.player.respawn(feet)?;
        ctx.game.reset_for_new_life();
        self.terrain_contacts.clear();
        self.overlap_contacts.clear();
        self.camera
            .snap_to(self.player.body.position.x, self.player.facing().sign());
        self.input_lockout = ctx.config.session.input_lockout_seconds;
        self.phase = SessionPhase::Playing;
        info!(lives = ctx.game.lives(), "player_respawned");
        Ok(())
    }

    /// Only a death during play costs a life; a finished level is kept.
    fn on_player_died(&mut self, cause: DeathCause, ctx: &mut TickContext<'_>) {
        if self.phase != SessionPhase::Playing {
            return;
        }
        ctx.events.emit(GameEvent::PlayerDied { cause });
        let game_over = ctx.game.lose_life();
        debug!(lives = ctx.game.lives(), game_over, "life_lost");
        self.phase = SessionPhase::Dying {
            remaining: ctx.config.session.respawn_delay_seconds,
        };
    }

    fn steer_player(
        &mut self,
        dt: f32,
        input: &InputSnapshot,
        ctx: &mut TickContext<'_>,
        world: &mut SceneWorld<Entity>,
    ) -> Result<(), SessionError> {
        if self.phase != SessionPhase::Playing {
            self.player.apply_movement(0.0, dt);
            return Ok(());
        }
        if input.jump_pressed() {
            if let Some(kind) = self.player.try_jump() {
                debug!(?kind, "player_jumped");
            }
        }
        if input.shoot_pressed() {
            self.shoot_fireball(ctx, world)?;
        }
        self.player.apply_movement(input.movement_axis(), dt);
        Ok(())
    }

    fn shoot_fireball(
        &mut self,
        ctx: &mut TickContext<'_>,
        world: &mut SceneWorld<Entity>,
    ) -> Result<(), SessionError> {
        if !self.player.can_shoot() {
            return Ok(());
        }
        let alive = world
            .iter()
            .filter(|(id, entity)| {
                !world.is_pending_despawn(*id)
                    && entity.as_projectile().is_some_and(Projectile::is_fireball)
            })
            .count();
        if alive >= ctx.config.player.max_fireballs {
            return Ok(());
        }
        let (fireball, body) = Projectile::fireball(
            self.player.muzzle(),
            self.player.facing().sign(),
            &ctx.config.projectiles,
        )?;
        world.spawn(Entity::new(body, EntityKind::Projectile(fireball)));
        ctx.events.emit(GameEvent::FireballShot);
        Ok(())
    }

    /// Behaviour step for every non-player entity: timers, walk speeds and
    /// shooter volleys. Expired entities are queued for removal.
    fn update_entities(
        &mut self,
        dt: f32,
        ctx: &mut TickContext<'_>,
        world: &mut SceneWorld<Entity>,
    ) -> Result<(), SessionError> {
        let config = ctx.config;
        let visible = self.camera.visible_rect();
        let mut volleys = Vec::new();
        for id in world.ids() {
            if world.is_pending_despawn(id) {
                continue;
            }
            let Some(Entity { body, kind }) = world.get_mut(id) else {
                continue;
            };
            let expired = match kind {
                EntityKind::Enemy(enemy) => {
                    let update = enemy.update(body, dt, &config.enemy);
                    if let Some(shot) = update.shot {
                        // Off-screen shooters hold their fire.
                        if visible.overlaps(&body.aabb()) {
                            let origin = enemy.shot_origin(body, config.projectiles.spawn_offset);
                            volleys.push((shot, origin, enemy.direction()));
                        }
                    }
                    update.expired
                }
                EntityKind::Item(item) => item.update(body, dt, &config.items),
                EntityKind::Projectile(projectile) => projectile.update(dt, &config.projectiles),
                EntityKind::Block(block) => {
                    block.update(dt);
                    false
                }
                EntityKind::Trigger(_) => false,
            };
            if expired {
                world.despawn(id);
            }
        }
        for (shot, origin, direction) in volleys {
            let (projectile, body) =
                Projectile::enemy_shot(shot, origin, direction, &config.projectiles)?;
            world.spawn(Entity::new(body, EntityKind::Projectile(projectile)));
        }
        Ok(())
    }

    /// Moves the player against the terrain, keeps its ground support in
    /// step with the contacts and resolves head-butts.
    fn move_player(
        &mut self,
        dt: f32,
        ctx: &mut TickContext<'_>,
        world: &mut SceneWorld<Entity>,
    ) -> Result<(), SessionError> {
        let config = ctx.config;
        let player_id = self.player.id();
        apply_gravity(&mut self.player.body, &config.physics.gravity(), dt);
        self.hits.clear();
        move_and_collide(&mut self.player.body, dt, &self.terrain, &mut self.hits);

        self.contacts.clear();
        self.contacts.extend(
            self.hits
                .iter()
                .map(|hit| Contact::new(player_id, hit.other, hit.normal)),
        );
        self.contacts.sort_by_key(Contact::key);
        self.contacts.dedup_by_key(|contact| contact.key());
        for key in self.terrain_contacts.update(&mut self.contacts) {
            self.player.end_support(key);
        }

        let threshold = config.player.landing_velocity_threshold;
        let mut ceiling: Option<(EntityId, f32)> = None;
        for hit in &self.hits {
            match classify_terrain(hit.normal, hit.impact_velocity, threshold) {
                TerrainContact::Landing => {
                    self.player.begin_support(ContactKey::new(player_id, hit.other));
                }
                TerrainContact::Ceiling => {
                    let Some(block) = world.get(hit.other) else {
                        continue;
                    };
                    let offset = (block.body.position.x - self.player.body.position.x).abs();
                    if ceiling.map_or(true, |(_, best)| offset < best) {
                        ceiling = Some((hit.other, offset));
                    }
                }
                TerrainContact::Wall | TerrainContact::Other => {}
            }
        }
        self.player.refresh_grounded();

        // Only the block nearest the player's center takes the hit.
        if let Some((block_id, _)) = ceiling {
            self.hit_block(block_id, ctx, world)?;
        }
        Ok(())
    }

    fn hit_block(
        &mut self,
        block_id: EntityId,
        ctx: &mut TickContext<'_>,
        world: &mut SceneWorld<Entity>,
    ) -> Result<(), SessionError> {
        let config = ctx.config;
        let strong = self.player.is_big();
        let Some(Entity {
            body,
            kind: EntityKind::Block(block),
        }) = world.get_mut(block_id)
        else {
            return Ok(());
        };
        let position = body.position;
        match block.hit_from_below(strong, config.session.block_bump_seconds) {
            BlockHitOutcome::Ignored => {}
            BlockHitOutcome::Bumped { release } => {
                ctx.events.emit(GameEvent::BlockBumped { position });
                match release {
                    Some(Release::Coin) => {
                        pay_coin(ctx);
                        let (item, body) = Item::coin_pop(position, self.tile_size, &config.items)?;
                        world.spawn(Entity::new(body, EntityKind::Item(item)));
                    }
                    Some(Release::Item(kind)) => {
                        let (item, body) =
                            Item::emerging(kind, position, self.tile_size, &config.items)?;
                        world.spawn(Entity::new(body, EntityKind::Item(item)));
                        ctx.events.emit(GameEvent::ItemSpawned { kind, position });
                    }
                    None => {}
                }
            }
            BlockHitOutcome::Broken => {
                ctx.game.add_score(config.scoring.brick_points);
                ctx.events.emit(GameEvent::BlockBroken { position });
                world.despawn(block_id);
                self.removed_solids.push(block_id);
            }
        }
        Ok(())
    }

    /// Gravity and terrain resolution for every dynamic entity.
    fn move_entities(&mut self, dt: f32, ctx: &mut TickContext<'_>, world: &mut SceneWorld<Entity>) {
        let config = ctx.config;
        let gravity = config.physics.gravity();
        let threshold = config.player.landing_velocity_threshold;
        for id in world.ids() {
            if world.is_pending_despawn(id) {
                continue;
            }
            let Some(Entity { body, kind }) = world.get_mut(id) else {
                continue;
            };
            if body.is_static {
                continue;
            }
            apply_gravity(body, &gravity, dt);
            self.hits.clear();
            move_and_collide(body, dt, &self.terrain, &mut self.hits);
            if self.hits.is_empty() {
                continue;
            }

            let mut destroyed = false;
            match kind {
                EntityKind::Enemy(enemy) => {
                    let direction = enemy.direction();
                    if self.hits.iter().any(|hit| hit.normal.x * direction < -0.5) {
                        enemy.reverse();
                    }
                }
                EntityKind::Item(item) => {
                    for hit in &self.hits {
                        match classify_terrain(hit.normal, hit.impact_velocity, threshold) {
                            TerrainContact::Wall if hit.normal.x * item.direction() < 0.0 => {
                                item.on_wall();
                            }
                            TerrainContact::Landing => {
                                item.on_landing(body, hit.impact_velocity.y, &config.items);
                            }
                            _ => {}
                        }
                    }
                }
                EntityKind::Projectile(projectile) => {
                    for hit in &self.hits {
                        match projectile.on_terrain(body, hit.normal, &config.projectiles) {
                            TerrainOutcome::Destroyed => {
                                destroyed = true;
                                break;
                            }
                            TerrainOutcome::Rested => break,
                            TerrainOutcome::Bounced | TerrainOutcome::Unchanged => {}
                        }
                    }
                }
                EntityKind::Block(_) | EntityKind::Trigger(_) => {}
            }
            if destroyed {
                world.despawn(id);
            }
        }
    }

    /// Overlap pass over the player and every non-terrain entity. Only
    /// contacts that began this tick are acted on.
    fn resolve_overlaps(&mut self, ctx: &mut TickContext<'_>, world: &mut SceneWorld<Entity>) {
        let player_id = self.player.id();
        self.probes.clear();
        if !self.player.is_dead() {
            self.probes
                .push(ContactProbe::from_body(player_id, &self.player.body));
        }
        for (id, entity) in world.iter() {
            if entity.tag() == EntityTag::Block || world.is_pending_despawn(id) {
                continue;
            }
            self.probes.push(ContactProbe::from_body(id, &entity.body));
        }
        detect_overlaps(&self.probes, &mut self.contacts);
        self.overlap_contacts.update(&mut self.contacts);

        let contacts = std::mem::take(&mut self.contacts);
        for contact in contacts.iter().filter(|contact| contact.began) {
            match contact.other(player_id) {
                Some(other) => self.player_touch(other, ctx, world),
                None => entity_touch(contact.a, contact.b, ctx, world),
            }
        }
        self.contacts = contacts;
    }

    fn player_touch(
        &mut self,
        other: EntityId,
        ctx: &mut TickContext<'_>,
        world: &mut SceneWorld<Entity>,
    ) {
        if self.phase != SessionPhase::Playing
            || self.player.is_dead()
            || world.is_pending_despawn(other)
        {
            return;
        }
        let Some(tag) = world.get(other).map(Entity::tag) else {
            return;
        };
        match tag {
            EntityTag::Enemy => self.touch_enemy(other, ctx, world),
            EntityTag::Item => self.touch_item(other, ctx, world),
            EntityTag::Projectile => self.touch_projectile(other, ctx, world),
            EntityTag::Trigger => {
                let Some(trigger) = world.get(other) else {
                    return;
                };
                if is_hazard(trigger.body.category) {
                    if self.player.kill(DeathCause::Hazard) {
                        self.on_player_died(DeathCause::Hazard, ctx);
                    }
                } else if trigger.as_trigger() == Some(Trigger::Flagpole) {
                    self.reach_flagpole(ctx);
                }
            }
            EntityTag::Block | EntityTag::Player => {}
        }
    }

    fn touch_enemy(&mut self, id: EntityId, ctx: &mut TickContext<'_>, world: &mut SceneWorld<Entity>) {
        let config = ctx.config;
        let tuning = &config.enemy;
        let Some(Entity {
            body,
            kind: EntityKind::Enemy(enemy),
        }) = world.get_mut(id)
        else {
            return;
        };
        if enemy.is_dead() {
            return;
        }
        let kind = enemy.kind();
        let position = body.position;
        let player = &mut self.player;

        if player.is_invincible() {
            if enemy.kill(body, DeathStyle::KnockedOut, tuning) {
                let points = config.scoring.stomp_points;
                ctx.game.add_score(points);
                ctx.events.emit(GameEvent::EnemyDefeated {
                    kind,
                    points,
                    position,
                });
            }
            return;
        }

        let away = direction_away(
            player.body.position.x,
            position.x,
            player.facing().sign(),
        );
        if is_stomp(
            &player.body,
            body,
            tuning.stomp_tolerance,
            tuning.stomp_max_vertical_speed,
        ) {
            match enemy.on_stomp(body, away, tuning) {
                StompOutcome::Ignored => return,
                StompOutcome::NotStompable => {}
                outcome => {
                    player.bounce();
                    let score = ctx.game.add_stomp_score(self.clock);
                    ctx.events.emit(GameEvent::EnemyStomped {
                        kind,
                        multiplier: score.multiplier,
                    });
                    if outcome == StompOutcome::Killed {
                        ctx.events.emit(GameEvent::EnemyDefeated {
                            kind,
                            points: score.points,
                            position,
                        });
                    }
                    return;
                }
            }
        } else if enemy.state() == EnemyState::Shelled {
            enemy.kick(body, away, tuning);
            return;
        }

        if enemy.can_damage_player() {
            self.damage_player(ctx);
        }
    }

    fn damage_player(&mut self, ctx: &mut TickContext<'_>) {
        match self.player.take_damage() {
            DamageOutcome::Ignored => {}
            DamageOutcome::PoweredDown(form) => {
                ctx.events.emit(GameEvent::PlayerDamaged { form });
            }
            DamageOutcome::Died => self.on_player_died(DeathCause::Damage, ctx),
        }
    }

    fn touch_item(&mut self, id: EntityId, ctx: &mut TickContext<'_>, world: &mut SceneWorld<Entity>) {
        let Some(item) = world.get(id).and_then(Entity::as_item) else {
            return;
        };
        if !item.is_collectible() {
            return;
        }
        let kind = item.kind();
        world.despawn(id);
        match kind {
            ItemKind::Coin => pay_coin(ctx),
            ItemKind::ExtraLife => {
                ctx.game.add_life();
                ctx.events.emit(GameEvent::PowerUpCollected { kind });
                ctx.events.emit(GameEvent::ExtraLifeAwarded {
                    lives: ctx.game.lives(),
                });
            }
            ItemKind::Mushroom | ItemKind::FireFlower | ItemKind::Star => {
                self.player.collect(kind);
                ctx.game.add_score(ctx.config.scoring.power_up_points);
                ctx.events.emit(GameEvent::PowerUpCollected { kind });
            }
        }
    }

    fn touch_projectile(
        &mut self,
        id: EntityId,
        ctx: &mut TickContext<'_>,
        world: &mut SceneWorld<Entity>,
    ) {
        let Some(projectile) = world.get(id).and_then(Entity::as_projectile) else {
            return;
        };
        let ProjectileKind::Shot(shot) = projectile.kind() else {
            return;
        };
        world.despawn(id);
        if self.player.is_invincible() {
            return;
        }
        match shot {
            ShotKind::Frost => {
                self.player.freeze();
                ctx.events.emit(GameEvent::PlayerFrozen);
            }
            ShotKind::Flame => self.damage_player(ctx),
        }
    }

    fn reach_flagpole(&mut self, ctx: &mut TickContext<'_>) {
        if self.phase != SessionPhase::Playing {
            return;
        }
        let time_bonus = ctx.game.complete_level();
        ctx.events.emit(GameEvent::LevelComplete {
            level: ctx.game.level(),
            time_bonus,
        });
        self.player.body.velocity.x = 0.0;
        self.phase = SessionPhase::LevelComplete {
            remaining: ctx.config.session.level_complete_delay_seconds,
        };
    }

    /// Keeps the player inside the level, kills it below the fall line and
    /// culls entities that left the playable space.
    fn enforce_bounds(&mut self, ctx: &mut TickContext<'_>, world: &mut SceneWorld<Entity>) {
        let fall_line = ctx.config.physics.fall_death_y;
        if !self.player.is_dead() {
            self.player.clamp_to_width(self.world_width);
            if self.phase == SessionPhase::Playing
                && self.player.body.top() < fall_line
                && self.player.kill(DeathCause::Fall)
            {
                self.on_player_died(DeathCause::Fall, ctx);
            }
        }

        let visible = self.camera.visible_rect();
        let doomed: Vec<EntityId> = world
            .iter()
            .filter(|(_, entity)| !entity.body.is_static)
            .filter(|(_, entity)| {
                let position = entity.body.position;
                let fallen = entity.body.top() < fall_line;
                let stray_projectile = entity.as_projectile().is_some_and(|projectile| {
                    position.x < 0.0
                        || position.x > self.world_width
                        || (projectile.is_fireball() && !visible.overlaps(&entity.body.aabb()))
                });
                fallen || stray_projectile
            })
            .map(|(id, _)| id)
            .collect();
        for id in doomed {
            world.despawn(id);
        }
    }

    /// Broken blocks leave the terrain index only once the tick is over.
    fn flush_removed_solids(&mut self) {
        let player_id = self.player.id();
        for id in self.removed_solids.drain(..) {
            self.terrain.remove_owner(id);
            self.terrain_contacts.forget(id);
            self.player.end_support(ContactKey::new(player_id, id));
        }
    }
}

fn pay_coin(ctx: &mut TickContext<'_>) {
    let outcome = ctx.game.collect_coin();
    ctx.events.emit(GameEvent::CoinCollected {
        coins: ctx.game.coins(),
        points: outcome.points,
    });
    if outcome.extra_life {
        ctx.events.emit(GameEvent::ExtraLifeAwarded {
            lives: ctx.game.lives(),
        });
    }
}

/// Fireballs and moving shells against enemies.
fn entity_touch(
    a: EntityId,
    b: EntityId,
    ctx: &mut TickContext<'_>,
    world: &mut SceneWorld<Entity>,
) {
    if world.is_pending_despawn(a) || world.is_pending_despawn(b) {
        return;
    }
    let Some((first, second)) = world.pair_mut(a, b) else {
        return;
    };
    let (strike, attacker) = match strike_enemy(first, second, ctx.config) {
        Some(strike) => (strike, a),
        None => match strike_enemy(second, first, ctx.config) {
            Some(strike) => (strike, b),
            None => return,
        },
    };
    let points = ctx.config.scoring.stomp_points;
    ctx.game.add_score(points);
    ctx.events.emit(GameEvent::EnemyDefeated {
        kind: strike.kind,
        points,
        position: strike.position,
    });
    if strike.consumes_attacker {
        world.despawn(attacker);
    }
}

fn strike_enemy(attacker: &mut Entity, target: &mut Entity, config: &GameConfig) -> Option<Strike> {
    let consumes_attacker = match &attacker.kind {
        EntityKind::Projectile(projectile) if projectile.is_fireball() => true,
        EntityKind::Enemy(enemy) if enemy.state() == EnemyState::ShellMoving => false,
        _ => return None,
    };
    let Entity {
        body,
        kind: EntityKind::Enemy(enemy),
    } = target
    else {
        return None;
    };
    let position = body.position;
    if !enemy.kill(body, DeathStyle::KnockedOut, &config.enemy) {
        return None;
    }
    Some(Strike {
        kind: enemy.kind(),
        position,
        consumes_attacker,
    })
}
