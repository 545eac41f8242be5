//! ABI surface of the external smart contracts.
//!
//! The contracts themselves are opaque: only the entry points and events the
//! workflows consume are declared here. Calldata is encoded with
//! [`SolCall::abi_encode`](alloy_sol_types::SolCall::abi_encode) and pushed
//! through the [`ChainRpc`](crate::chain::ChainRpc) seam.

use alloy_sol_types::sol;

sol! {
    /// Deploys and tracks device wallets; the admin-facing registry.
    interface IDeviceWalletFactory {
        function deviceWalletInfoAdded(address deviceWallet) external view returns (bool);
        function eSIMWalletAdmin() external view returns (address);
        function postCreateAccount(
            address deviceWallet,
            string memory deviceUniqueIdentifier,
            bytes32[2] memory deviceWalletOwnerKey
        ) external;
    }

    /// A user's device wallet; parent of the eSIM wallets deployed for it.
    interface IDeviceWallet {
        function deviceUniqueIdentifier() external view returns (string memory);
        function owner(uint256 index) external view returns (bytes32);
        function deployESIMWallet(bool hasAccessToETH, uint256 salt) external;
        function setESIMUniqueIdentifierForAnESIMWallet(
            address eSIMWallet,
            string memory eSIMUniqueIdentifier
        ) external;
        function isValidESIMWallet(address eSIMWallet) external view returns (bool);

        event ESIMWalletAdded(
            address indexed eSIMWalletAddress,
            bool hasAccessToETH,
            address indexed caller
        );
    }

    /// Holds a device's connectivity-product state; the purchase entry point.
    interface IESIMWallet {
        struct DataBundleDetails {
            string dataBundleID;
            uint256 dataBundlePrice;
        }

        function buyDataBundle(DataBundleDetails memory dataBundleDetail) external payable;
    }

    /// Chainlink-style price feed; `answer` is 8-decimal fixed point.
    interface IAggregatorV3 {
        function latestRoundData()
            external
            view
            returns (
                uint80 roundId,
                int256 answer,
                uint256 startedAt,
                uint256 updatedAt,
                uint80 answeredInRound
            );
    }

    /// Standard fungible-token transfer event.
    interface IERC20 {
        event Transfer(address indexed from, address indexed to, uint256 value);
    }
}
