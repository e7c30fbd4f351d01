use crate::prelude::*;
use crate::state::{State, StateContext};

const WITHDRAW_PERMISSIONS: Map<PermissionId, WithdrawPermission> =
    Map::new(namespace::WITHDRAW_PERMISSIONS);
const WITHDRAWS_BY_EXPIRATION: Map<(Timestamp, PermissionId), ()> =
    Map::new(namespace::WITHDRAWS_BY_EXPIRATION);
const LAST_PERMISSION_ID: Item<PermissionId> = Item::new(namespace::LAST_PERMISSION_ID);

/// Authorization for one account to withdraw from another until it expires.
#[cw_serde]
pub struct WithdrawPermission {
    /// Identity of the permission
    pub id: PermissionId,
    /// The account funds may be withdrawn from
    pub withdraw_from: String,
    /// The account allowed to withdraw
    pub authorized_account: String,
    /// When the permission lapses
    pub expiration: Timestamp,
}

impl State {
    /// Grant a withdraw permission.
    pub fn create_withdraw_permission(
        &self,
        ctx: &mut StateContext,
        withdraw_from: &str,
        authorized_account: &str,
        expiration: Timestamp,
    ) -> Result<PermissionId> {
        let id = LAST_PERMISSION_ID
            .may_load(ctx.storage)?
            .map(|last| last.next())
            .unwrap_or_else(|| PermissionId::new(1));
        LAST_PERMISSION_ID.save(ctx.storage, &id)?;

        WITHDRAW_PERMISSIONS.save(
            ctx.storage,
            id,
            &WithdrawPermission {
                id,
                withdraw_from: withdraw_from.to_owned(),
                authorized_account: authorized_account.to_owned(),
                expiration,
            },
        )?;
        WITHDRAWS_BY_EXPIRATION.save(ctx.storage, (expiration, id), &())?;
        Ok(id)
    }

    /// Load a permission by id.
    pub fn get_withdraw_permission(
        &self,
        store: &dyn Storage,
        id: PermissionId,
    ) -> Result<WithdrawPermission> {
        WITHDRAW_PERMISSIONS.load(store, id).map_err(|_| {
            chain_anyhow!(
                ErrorId::MissingObject,
                ErrorDomain::Chain,
                "no withdraw permission {id}"
            )
        })
    }

    /// Remove lapsed withdraw permissions.
    pub fn update_withdraw_permissions(&self, ctx: &mut StateContext) -> Result<()> {
        let head_time = self.head_block_time(ctx.storage)?;
        loop {
            let front = WITHDRAWS_BY_EXPIRATION
                .keys(ctx.storage, None, None, Order::Ascending)
                .next()
                .transpose()?;
            let (expiration, id) = match front {
                Some(key) => key,
                None => break,
            };
            if expiration > head_time {
                break;
            }
            WITHDRAW_PERMISSIONS.remove(ctx.storage, id);
            WITHDRAWS_BY_EXPIRATION.remove(ctx.storage, (expiration, id));
        }
        Ok(())
    }
}
